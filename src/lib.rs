//! Job-Trawler: a rotating-identity job listing crawler
//!
//! This crate walks a paginated job search API, fetches the detail page of
//! every listing it has not stored yet, rewrites the description into a
//! bounded and annotated HTML snippet, and commits each page's new listings
//! to SQLite exactly once per listing id.

pub mod config;
pub mod crawler;
pub mod description;
pub mod identity;
pub mod listing;
pub mod output;
pub mod storage;

#[cfg(test)]
mod test_support;

use thiserror::Error;

/// Main error type for Job-Trawler operations
#[derive(Debug, Error)]
pub enum TrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Network identity error: {0}")]
    Identity(#[from] identity::IdentityError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("Parse error: {0}")]
    Parse(#[from] crawler::ParseError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Crawl cancelled")]
    Cancelled,
}

impl TrawlError {
    /// Returns true if the whole run must stop after cleanup
    ///
    /// A VPN client that had to be force-killed may have left routes or
    /// tunnel devices behind, so no further rotation can be trusted.
    pub fn is_run_fatal(&self) -> bool {
        matches!(
            self,
            Self::Cancelled | Self::Identity(identity::IdentityError::ForceKill { .. })
        )
    }

    /// Returns true if the current (keyword, location) pair must be abandoned
    pub fn is_pair_fatal(&self) -> bool {
        self.is_run_fatal() || matches!(self, Self::Identity(_) | Self::Storage(_))
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Job-Trawler operations
pub type Result<T> = std::result::Result<T, TrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, CrawlSummary};
pub use description::{DescriptionProcessor, Fragment};
pub use identity::{ConnectionState, NetworkIdentityManager};
pub use listing::{CrawlCursor, Listing, ListingStatus};

#[cfg(test)]
mod tests {
    use super::*;
    use identity::IdentityError;
    use std::time::Duration;

    #[test]
    fn test_force_kill_is_run_fatal() {
        let err = TrawlError::Identity(IdentityError::ForceKill {
            pid: 42,
            waited: Duration::from_secs(15),
        });
        assert!(err.is_run_fatal());
        assert!(err.is_pair_fatal());
    }

    #[test]
    fn test_identity_errors_abort_pair_only() {
        let err = TrawlError::Identity(IdentityError::IdentityUnchanged {
            ip: "203.0.113.7".to_string(),
        });
        assert!(!err.is_run_fatal());
        assert!(err.is_pair_fatal());
    }

    #[test]
    fn test_fetch_errors_are_page_local() {
        let err = TrawlError::Fetch(crawler::FetchError::Exhausted {
            url: "https://example.com".to_string(),
            attempts: 3,
        });
        assert!(!err.is_pair_fatal());
        assert!(TrawlError::Cancelled.is_pair_fatal());
    }
}
