use crate::config::SearchLocation;

/// Position of the crawl within one (keyword, location) pair
///
/// A cursor starts at page 0 for every pair and only moves forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlCursor {
    pub keyword: String,
    pub location: SearchLocation,
    pub page_index: u32,
}

impl CrawlCursor {
    pub fn new(keyword: impl Into<String>, location: SearchLocation) -> Self {
        Self {
            keyword: keyword.into(),
            location,
            page_index: 0,
        }
    }

    /// Result offset of the current page for the given page size
    ///
    /// Saturates at `u32::MAX` instead of wrapping back to earlier results.
    pub fn start_offset(&self, page_size: u32) -> u32 {
        self.page_index.saturating_mul(page_size)
    }

    /// Moves to the next page
    pub fn advance(&mut self) {
        self.page_index = self.page_index.saturating_add(1);
    }

    /// Returns true if identity should be rotated before fetching this page
    pub fn is_rotation_page(&self, cadence: u32) -> bool {
        cadence > 0 && self.page_index % cadence == 0
    }
}
