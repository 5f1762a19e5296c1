//! Storage traits and error types
//!
//! This module defines the trait interface for listing stores and
//! associated error types.

use crate::listing::{Listing, ListingStatus};
use crate::storage::{RunRecord, RunStatus};
use std::collections::HashSet;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Invalid stored value: {0}")]
    InvalidValue(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for listing store implementations
///
/// The crawler reads the full id set once per search page and then commits
/// that page's new listings as one batch, so implementations must make
/// `get_all_listing_ids` cheap and `commit_batch` atomic.
pub trait ListingStore {
    // ===== Listings =====

    /// Returns the ids of every stored listing
    fn get_all_listing_ids(&self) -> StorageResult<HashSet<i64>>;

    /// Inserts a batch of listings atomically
    ///
    /// Listings whose id is already stored are ignored. Returns the number
    /// of rows actually inserted.
    fn commit_batch(&mut self, listings: &[Listing]) -> StorageResult<usize>;

    /// Gets a listing by id
    fn get_listing(&self, id: i64) -> StorageResult<Option<Listing>>;

    /// Counts all stored listings
    fn count_listings(&self) -> StorageResult<u64>;

    /// Counts stored listings with the given status
    fn count_listings_by_status(&self, status: ListingStatus) -> StorageResult<u64>;

    // ===== Run Management =====

    /// Creates a new crawl run and returns its id
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Marks a run as finished with the given status
    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        listings_added: usize,
    ) -> StorageResult<()>;

    /// Gets a run by id
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;
}
