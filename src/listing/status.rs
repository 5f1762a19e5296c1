/// Listing status definitions
///
/// The status is the screening signal derived while the description is
/// processed. It is persisted as a small integer.
use std::fmt;

/// Screening status of a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ListingStatus {
    /// Nothing in the description suggests a senior requirement
    #[default]
    Normal,

    /// The description asks for more years of experience than an entry-level
    /// screen allows
    Flagged,
}

impl ListingStatus {
    /// Converts the status to its database representation
    pub fn to_db_value(&self) -> i64 {
        match self {
            Self::Normal => 0,
            Self::Flagged => 1,
        }
    }

    /// Parses a status from its database representation
    ///
    /// Returns None if the value doesn't match any known status.
    pub fn from_db_value(value: i64) -> Option<Self> {
        match value {
            0 => Some(Self::Normal),
            1 => Some(Self::Flagged),
            _ => None,
        }
    }

    /// Returns the status for a flag produced by the description processor
    pub fn from_flag(flagged: bool) -> Self {
        if flagged {
            Self::Flagged
        } else {
            Self::Normal
        }
    }

    pub fn is_flagged(&self) -> bool {
        matches!(self, Self::Flagged)
    }
}

impl fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::Flagged => write!(f, "flagged"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_values_match_schema() {
        assert_eq!(ListingStatus::Normal.to_db_value(), 0);
        assert_eq!(ListingStatus::Flagged.to_db_value(), 1);
        assert_eq!(ListingStatus::from_db_value(1), Some(ListingStatus::Flagged));
        assert_eq!(ListingStatus::from_db_value(7), None);
    }

    #[test]
    fn test_from_flag() {
        assert!(ListingStatus::from_flag(true).is_flagged());
        assert!(!ListingStatus::from_flag(false).is_flagged());
        assert_eq!(ListingStatus::default(), ListingStatus::Normal);
    }
}
