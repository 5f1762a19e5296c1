//! Statistics generation from the listing database
//!
//! This module provides functionality for extracting and displaying
//! listing and run statistics from the storage layer.

use crate::listing::ListingStatus;
use crate::storage::{ListingStore, RunRecord};
use crate::Result;

/// Listing database statistics
#[derive(Debug, Clone)]
pub struct ListingStatistics {
    /// Total number of stored listings
    pub total_listings: u64,

    /// Listings flagged by their experience requirement
    pub flagged_listings: u64,

    /// Most recent crawl run, if any
    pub latest_run: Option<RunRecord>,
}

impl ListingStatistics {
    /// Wall-clock duration of the latest run, once it has finished
    pub fn latest_run_seconds(&self) -> Option<i64> {
        let run = self.latest_run.as_ref()?;
        let started = run.started_at.parse::<chrono::DateTime<chrono::Utc>>().ok()?;
        let finished = run
            .finished_at
            .as_ref()?
            .parse::<chrono::DateTime<chrono::Utc>>()
            .ok()?;
        Some((finished - started).num_seconds())
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(ListingStatistics)` - Successfully loaded statistics
/// * `Err(TrawlError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn ListingStore) -> Result<ListingStatistics> {
    Ok(ListingStatistics {
        total_listings: storage.count_listings()?,
        flagged_listings: storage.count_listings_by_status(ListingStatus::Flagged)?,
        latest_run: storage.get_latest_run()?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &ListingStatistics) {
    println!("=== Listing Statistics ===\n");

    let flagged_share = if stats.total_listings > 0 {
        (stats.flagged_listings as f64 / stats.total_listings as f64) * 100.0
    } else {
        0.0
    };

    println!("Listings:");
    println!("  Total: {}", stats.total_listings);
    println!(
        "  Flagged: {} ({:.1}%)",
        stats.flagged_listings, flagged_share
    );
    println!();

    match &stats.latest_run {
        Some(run) => {
            println!("Latest Run:");
            println!("  Id: {}", run.id);
            println!("  Status: {}", run.status.to_db_string());
            println!("  Started: {}", run.started_at);
            if let Some(finished) = &run.finished_at {
                println!("  Finished: {}", finished);
            }
            if let Some(seconds) = stats.latest_run_seconds() {
                println!("  Duration: {}s", seconds);
            }
            println!("  Listings added: {}", run.listings_added);
            println!("  Config hash: {}", run.config_hash);
        }
        None => println!("No crawl runs recorded yet"),
    }
}
