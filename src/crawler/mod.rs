//! Crawler module for search and detail page processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with courtesy delays and retry logic
//! - Search result and detail page parsing
//! - API URL construction
//! - Logo retrieval
//! - Overall crawl coordination

mod coordinator;
mod endpoints;
mod fetcher;
mod logos;
mod parser;

pub use coordinator::{run_crawl, Coordinator, CrawlSummary};
pub use endpoints::Endpoints;
pub use fetcher::{build_http_client, DelayWindow, FetchError, RetryingFetcher, MAX_ATTEMPTS};
pub use logos::LogoStore;
pub use parser::{parse_detail_page, parse_search_page, DetailPage, ParseError, SearchPage};
