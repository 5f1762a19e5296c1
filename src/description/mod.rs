//! Description post-processing
//!
//! Turns the description container of a detail page into the HTML snippet
//! that is stored with a listing:
//! - Experience requirements are wrapped in highlight spans and may flag
//!   the listing
//! - Oversized descriptions are cut at a top-level child boundary
//! - The qualification section heading receives an anchor id
//!
//! All steps are pure functions over an owned [`Fragment`].

mod experience;
mod fragment;
mod qualifications;
mod truncate;

pub use experience::{ExperienceHighlighter, HIGHLIGHT_CLASS};
pub use fragment::{Element, Fragment, Node};
pub use qualifications::{
    find_qualification_section, qualification_anchor, tag_qualifications, QUALIFICATION_CLASS,
};
pub use truncate::{default_truncation_budget, truncate, TRUNCATION_MARKER};

use crate::config::ProcessingConfig;
use crate::listing::ListingStatus;

/// Upper bound for a stored description, in UTF-8 bytes
pub const MAX_DESCRIPTION_BYTES: usize = 10_000;

/// Room left for the anchor id and class added by qualification tagging:
/// ` id="qualifications-<i64>"` plus ` class="qualifications"`
const TAG_RESERVE_BYTES: usize = 64;

/// Result of processing one description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedDescription {
    /// Normalized HTML, at most `MAX_DESCRIPTION_BYTES` long
    pub html: String,
    pub status: ListingStatus,
}

/// Runs the description pipeline for a listing
#[derive(Debug, Clone)]
pub struct DescriptionProcessor {
    /// Highlighting and tagging; truncation always runs
    annotate: bool,
    highlighter: ExperienceHighlighter,
}

impl DescriptionProcessor {
    pub fn new(annotate: bool) -> Self {
        Self {
            annotate,
            highlighter: ExperienceHighlighter::new(),
        }
    }

    pub fn from_config(config: &ProcessingConfig) -> Self {
        Self::new(config.enable)
    }

    /// Highlights experience mentions; see [`ExperienceHighlighter`]
    pub fn highlight_experience(&self, fragment: &Fragment) -> (Fragment, bool) {
        self.highlighter.highlight(fragment)
    }

    /// Processes a description container's contents
    ///
    /// Order: highlight, truncate if over the limit, tag, then serialize with
    /// leading whitespace and newlines removed. Truncation sees the
    /// highlight spans and tagging sees the truncated tree.
    pub fn process(&self, listing_id: i64, fragment: &Fragment) -> ProcessedDescription {
        let (highlighted, flagged) = if self.annotate {
            self.highlight_experience(fragment)
        } else {
            (fragment.clone(), false)
        };

        let over_limit = highlighted.byte_len() > MAX_DESCRIPTION_BYTES;
        let mut tree = if over_limit {
            truncate(&highlighted, self.truncation_budget())
        } else {
            highlighted
        };

        if self.annotate {
            let mut tagged = tag_qualifications(&tree, listing_id);
            // The anchor attributes can push a description that was just
            // under the limit over it
            if !over_limit && tagged.byte_len() > MAX_DESCRIPTION_BYTES {
                tagged = tag_qualifications(&truncate(&tree, self.truncation_budget()), listing_id);
            }
            tree = tagged;
        }

        ProcessedDescription {
            html: normalize(&tree.to_html()),
            status: ListingStatus::from_flag(flagged),
        }
    }

    fn truncation_budget(&self) -> usize {
        if self.annotate {
            default_truncation_budget() - TAG_RESERVE_BYTES
        } else {
            default_truncation_budget()
        }
    }
}

impl Default for DescriptionProcessor {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Strips leading whitespace and all newlines
fn normalize(html: &str) -> String {
    html.trim_start().replace('\n', "")
}
