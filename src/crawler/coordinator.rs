//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the main crawl loop that coordinates all aspects of
//! the crawling process, including:
//! - Walking every (keyword, location) pair page by page
//! - Rotating the network identity on a fixed page cadence
//! - Deduplicating search results against the store
//! - Fetching, processing and committing new listings
//! - Releasing the VPN connection on every exit path

use crate::config::Config;
use crate::crawler::endpoints::Endpoints;
use crate::crawler::fetcher::RetryingFetcher;
use crate::crawler::logos::LogoStore;
use crate::crawler::parser::{parse_detail_page, parse_search_page};
use crate::description::DescriptionProcessor;
use crate::identity::NetworkIdentityManager;
use crate::listing::{CrawlCursor, Listing};
use crate::storage::{ListingStore, RunStatus, SqliteStorage, StorageError};
use crate::{Result, TrawlError};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

/// Totals of one crawl run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    /// (keyword, location) pairs started
    pub pairs: u32,

    /// Pairs abandoned because of an identity or storage error
    pub pairs_aborted: u32,

    /// Search pages committed
    pub pages: u32,

    /// Search pages that failed and were skipped
    pub pages_failed: u32,

    pub listings_found: usize,
    pub listings_new: usize,
    pub listings_inserted: usize,

    /// New listings dropped because their detail page could not be used
    pub listings_skipped: usize,
}

/// Counts for one committed search page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PageStats {
    found: usize,
    new: usize,
    inserted: usize,
    skipped: usize,
}

#[derive(Debug)]
enum PageOutcome {
    EndOfResults,
    Committed(PageStats),
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    storage: Arc<Mutex<SqliteStorage>>,
    fetcher: RetryingFetcher,
    processor: DescriptionProcessor,
    identity: Option<NetworkIdentityManager>,
    logos: Option<LogoStore>,
    endpoints: Endpoints,
    config_hash: String,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// Opens the database, builds the HTTP client and, when the VPN is
    /// enabled, the identity manager. Nothing is fetched or spawned yet.
    ///
    /// # Arguments
    ///
    /// * `config` - The validated crawler configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(TrawlError)` - Failed to initialize
    pub fn new(config: Config) -> Result<Self> {
        let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
        let fetcher = RetryingFetcher::from_config(&config.requests)?;

        let identity = if config.vpn.enable {
            Some(NetworkIdentityManager::from_config(&config.vpn)?)
        } else {
            None
        };

        let logos = config
            .output
            .logo_dir
            .as_ref()
            .map(|dir| LogoStore::new(fetcher.client().clone(), dir));

        Ok(Self {
            storage: Arc::new(Mutex::new(storage)),
            processor: DescriptionProcessor::from_config(&config.processing),
            endpoints: Endpoints::from_config(&config.api)?,
            config: Arc::new(config),
            fetcher,
            identity,
            logos,
            config_hash: String::new(),
        })
    }

    /// Records the configuration hash on the runs this coordinator starts
    pub fn with_config_hash(mut self, config_hash: impl Into<String>) -> Self {
        self.config_hash = config_hash.into();
        self
    }

    /// Replaces the identity manager built from the configuration
    pub fn with_identity(mut self, identity: Option<NetworkIdentityManager>) -> Self {
        self.identity = identity;
        self
    }

    /// Shared handle to the store
    pub fn storage(&self) -> Arc<Mutex<SqliteStorage>> {
        Arc::clone(&self.storage)
    }

    fn lock_storage(&self) -> Result<MutexGuard<'_, SqliteStorage>> {
        self.storage
            .lock()
            .map_err(|_| TrawlError::Storage(StorageError::LockPoisoned))
    }

    /// Runs the crawl over every configured (keyword, location) pair
    ///
    /// The VPN connection is released before this returns, whatever the
    /// outcome. The run is recorded in the store as completed, interrupted
    /// (cancellation) or failed.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<CrawlSummary> {
        let run_id = self.lock_storage()?.create_run(&self.config_hash)?;
        tracing::info!("Starting crawl run {}", run_id);
        let start_time = std::time::Instant::now();

        let mut summary = CrawlSummary::default();
        let result = self.crawl_all(cancel, &mut summary).await;
        let released = self.release_identity().await;
        let result = result.and(released);

        let status = match &result {
            Ok(()) => RunStatus::Completed,
            Err(TrawlError::Cancelled) => RunStatus::Interrupted,
            Err(_) => RunStatus::Failed,
        };
        self.lock_storage()?
            .finish_run(run_id, status, summary.listings_inserted)?;

        result?;

        tracing::info!(
            "Crawl completed: {} pages, {} new listings inserted in {:?}",
            summary.pages,
            summary.listings_inserted,
            start_time.elapsed()
        );
        Ok(summary)
    }

    async fn crawl_all(&self, cancel: &CancellationToken, summary: &mut CrawlSummary) -> Result<()> {
        let baseline_ip = match &self.identity {
            Some(identity) => {
                let ip = tokio::select! {
                    _ = cancel.cancelled() => return Err(TrawlError::Cancelled),
                    ip = identity.public_ip() => ip?,
                };
                tracing::info!("Public IP before rotation: {}", ip);
                Some(ip)
            }
            None => None,
        };

        let search = &self.config.search;
        for keyword in &search.keywords {
            for location in &search.locations {
                tracing::info!(
                    "SEARCH JOB SET: keywords='{}' location='{}' work type={} timespan={}",
                    keyword,
                    location.name,
                    search.work_type,
                    search.timespan
                );
                summary.pairs += 1;

                let cursor = CrawlCursor::new(keyword.as_str(), location.clone());
                let outcome = self
                    .crawl_pair(cursor, baseline_ip.as_deref(), cancel, summary)
                    .await;
                let released = self.release_identity().await;

                if let Err(e) = outcome {
                    if e.is_run_fatal() {
                        return Err(e);
                    }
                    tracing::error!(
                        "Abandoning search '{}' in {}: {}",
                        keyword,
                        location.name,
                        e
                    );
                    summary.pairs_aborted += 1;
                }
                released?;
            }
        }

        Ok(())
    }

    async fn crawl_pair(
        &self,
        mut cursor: CrawlCursor,
        baseline_ip: Option<&str>,
        cancel: &CancellationToken,
        summary: &mut CrawlSummary,
    ) -> Result<()> {
        let max_pages = self.config.search.max_pages;

        while cursor.page_index < max_pages {
            if cancel.is_cancelled() {
                return Err(TrawlError::Cancelled);
            }

            if let (Some(identity), Some(previous_ip)) = (&self.identity, baseline_ip) {
                let cadence = self.config.vpn.rotation_cadence;
                if cursor.is_rotation_page(cadence) || !identity.is_connected().await {
                    let ip = tokio::select! {
                        _ = cancel.cancelled() => return Err(TrawlError::Cancelled),
                        ip = identity.rotate(previous_ip) => ip?,
                    };
                    tracing::info!("Rotated identity, public IP is now {}", ip);
                }
            }

            let result = tokio::select! {
                _ = cancel.cancelled() => Err(TrawlError::Cancelled),
                result = self.crawl_page(&cursor) => result,
            };

            match result {
                Ok(PageOutcome::EndOfResults) => {
                    tracing::info!("No more results after page {}", cursor.page_index);
                    break;
                }
                Ok(PageOutcome::Committed(stats)) => {
                    summary.pages += 1;
                    summary.listings_found += stats.found;
                    summary.listings_new += stats.new;
                    summary.listings_inserted += stats.inserted;
                    summary.listings_skipped += stats.skipped;
                    tracing::info!(
                        "[{}/{}] Page committed: {} found, {} new, {} inserted",
                        cursor.page_index + 1,
                        max_pages,
                        stats.found,
                        stats.new,
                        stats.inserted
                    );
                }
                Err(e) if e.is_pair_fatal() => return Err(e),
                Err(e) => {
                    summary.pages_failed += 1;
                    tracing::error!("Page {} failed: {}", cursor.page_index, e);
                    self.release_identity().await?;
                }
            }

            cursor.advance();
        }

        Ok(())
    }

    /// Fetches one search page, enriches its new listings and commits them
    async fn crawl_page(&self, cursor: &CrawlCursor) -> Result<PageOutcome> {
        let url = self.endpoints.search_url(&self.config.search, cursor);
        tracing::debug!("Fetching search page: {}", url);

        let page = {
            let document = self.fetcher.fetch(url.as_str()).await?;
            parse_search_page(&document)
        };
        if page.is_end_of_results() {
            return Ok(PageOutcome::EndOfResults);
        }

        let known = self.lock_storage()?.get_all_listing_ids()?;
        let found = page.stubs.len();
        let new_stubs = select_new(page.stubs, &known);
        let new = new_stubs.len();
        tracing::info!("FILTER JOBS: {} found, {} not yet stored", found, new);

        let mut batch = Vec::with_capacity(new);
        for (index, stub) in new_stubs.into_iter().enumerate() {
            let id = stub.id;
            match self.enrich(stub).await {
                Ok(listing) => {
                    tracing::info!("[{}/{}] Processed job {}", index + 1, new, id);
                    batch.push(listing);
                }
                Err(e) => tracing::warn!("Skipping job {}: {}", id, e),
            }
        }

        let inserted = self.lock_storage()?.commit_batch(&batch)?;

        Ok(PageOutcome::Committed(PageStats {
            found,
            new,
            inserted,
            skipped: new - batch.len(),
        }))
    }

    /// Fills a stub in from its detail page
    async fn enrich(&self, stub: Listing) -> Result<Listing> {
        let url = self.endpoints.detail_url(stub.id);
        tracing::debug!("Fetching detail page: {}", url);

        let detail = {
            let document = self.fetcher.fetch(&url).await?;
            parse_detail_page(&document, stub.id)?
        };

        let processed = self.processor.process(stub.id, &detail.description);
        if processed.status.is_flagged() {
            tracing::debug!("Job {} flagged by experience requirement", stub.id);
        }

        if let (Some(logos), Some(logo_url)) = (&self.logos, &detail.logo_url) {
            if let Err(e) = logos.save(stub.id, logo_url).await {
                tracing::warn!("Failed to save logo of job {}: {}", stub.id, e);
            }
        }

        let url = detail
            .apply_url
            .clone()
            .unwrap_or_else(|| self.endpoints.view_url(stub.id));

        Ok(Listing {
            description: processed.html,
            meta: detail.meta(),
            url,
            status: processed.status,
            ..stub
        })
    }

    async fn release_identity(&self) -> Result<()> {
        match &self.identity {
            Some(identity) => identity.release().await.map_err(TrawlError::from),
            None => Ok(()),
        }
    }
}

/// Drops stubs whose id is already stored or already seen on this page
fn select_new(stubs: Vec<Listing>, known: &HashSet<i64>) -> Vec<Listing> {
    let mut seen = HashSet::new();
    stubs
        .into_iter()
        .filter(|stub| !known.contains(&stub.id) && seen.insert(stub.id))
        .collect()
}

/// Runs a complete crawl with a fresh coordinator
pub async fn run_crawl(
    config: Config,
    config_hash: &str,
    cancel: &CancellationToken,
) -> Result<CrawlSummary> {
    let coordinator = Coordinator::new(config)?.with_config_hash(config_hash);
    coordinator.run(cancel).await
}
