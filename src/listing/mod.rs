//! Listing module for the records the crawler produces
//!
//! # Components
//!
//! - `Listing`: One job posting, created as a stub by the search stage and
//!   enriched once by the detail stage
//! - `ListingStatus`: Screening signal derived from the description
//! - `CrawlCursor`: Position of the crawl inside one (keyword, location) pair

mod cursor;
mod status;

pub use cursor::CrawlCursor;
pub use status::ListingStatus;

use chrono::NaiveDate;

/// A job listing as stored in the database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    /// The site's own entity identifier, primary key in the store
    pub id: i64,
    pub title: String,
    pub company: String,
    pub location: String,
    pub date_created: NaiveDate,

    /// Normalized HTML, at most `description::MAX_DESCRIPTION_BYTES` bytes
    pub description: String,

    /// Applicant count and relative posting age
    pub meta: String,

    /// External apply URL, or the canonical view URL
    pub url: String,
    pub status: ListingStatus,
}

impl Listing {
    /// Creates a stub from the fields available on a search result card
    pub fn stub(
        id: i64,
        title: impl Into<String>,
        company: impl Into<String>,
        location: impl Into<String>,
        date_created: NaiveDate,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            company: company.into(),
            location: location.into(),
            date_created,
            description: String::new(),
            meta: String::new(),
            url: String::new(),
            status: ListingStatus::Normal,
        }
    }

    /// Returns true if the detail stage has not filled this listing in yet
    pub fn is_stub(&self) -> bool {
        self.description.is_empty() && self.url.is_empty()
    }
}
