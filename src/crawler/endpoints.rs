//! URL construction for the job site's guest API

use crate::config::{ApiConfig, SearchConfig};
use crate::listing::CrawlCursor;
use url::Url;

/// Parsed API endpoints
#[derive(Debug, Clone)]
pub struct Endpoints {
    search: Url,
    detail: Url,
    view: Url,
}

impl Endpoints {
    pub fn from_config(config: &ApiConfig) -> Result<Self, url::ParseError> {
        Ok(Self {
            search: Url::parse(&config.search_url)?,
            detail: Url::parse(&config.detail_url)?,
            view: Url::parse(&config.view_url)?,
        })
    }

    /// Search URL for the page the cursor points at
    pub fn search_url(&self, search: &SearchConfig, cursor: &CrawlCursor) -> Url {
        let mut url = self.search.clone();
        url.query_pairs_mut()
            .append_pair("keywords", &cursor.keyword)
            .append_pair("location", &cursor.location.name)
            .append_pair("geoId", &cursor.location.geo_id)
            .append_pair("f_E", &search.experience)
            .append_pair("f_TPR", &search.timespan)
            .append_pair("f_WT", &search.work_type)
            .append_pair(
                "start",
                &cursor.start_offset(search.page_size).to_string(),
            );
        url
    }

    pub fn detail_url(&self, listing_id: i64) -> String {
        join_id(&self.detail, listing_id)
    }

    /// Public listing page, used when a listing has no external apply URL
    pub fn view_url(&self, listing_id: i64) -> String {
        join_id(&self.view, listing_id)
    }
}

fn join_id(base: &Url, listing_id: i64) -> String {
    format!("{}/{}", base.as_str().trim_end_matches('/'), listing_id)
}
