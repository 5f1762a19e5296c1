//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the ListingStore trait.

use crate::listing::{Listing, ListingStatus};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{ListingStore, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus};
use chrono::{NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashSet;
use std::path::Path;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn row_to_listing(row: &Row<'_>) -> rusqlite::Result<Listing> {
    let date: String = row.get(4)?;
    let date_created = NaiveDate::parse_from_str(&date, DATE_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;

    let status_value: i64 = row.get(8)?;
    let status = ListingStatus::from_db_value(status_value).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            8,
            Type::Integer,
            Box::new(StorageError::InvalidValue(format!(
                "listing status {}",
                status_value
            ))),
        )
    })?;

    Ok(Listing {
        id: row.get(0)?,
        title: row.get(1)?,
        company: row.get(2)?,
        location: row.get(3)?,
        date_created,
        description: row.get(5)?,
        meta: row.get(6)?,
        url: row.get(7)?,
        status,
    })
}

fn row_to_run(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
            .unwrap_or(RunStatus::Running),
        listings_added: row.get::<_, i64>(5)? as u64,
    })
}

impl ListingStore for SqliteStorage {
    // ===== Listings =====

    fn get_all_listing_ids(&self) -> StorageResult<HashSet<i64>> {
        let mut stmt = self.conn.prepare("SELECT id FROM listings")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(ids)
    }

    fn commit_batch(&mut self, listings: &[Listing]) -> StorageResult<usize> {
        let inserted_at = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        let mut inserted = 0;

        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO listings
                 (id, title, company, location, date_created, description, meta, url, status, inserted_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;

            for listing in listings {
                inserted += stmt.execute(params![
                    listing.id,
                    listing.title,
                    listing.company,
                    listing.location,
                    listing.date_created.format(DATE_FORMAT).to_string(),
                    listing.description,
                    listing.meta,
                    listing.url,
                    listing.status.to_db_value(),
                    inserted_at,
                ])?;
            }
        }

        tx.commit()?;
        Ok(inserted)
    }

    fn get_listing(&self, id: i64) -> StorageResult<Option<Listing>> {
        let listing = self
            .conn
            .query_row(
                "SELECT id, title, company, location, date_created, description, meta, url, status
                 FROM listings WHERE id = ?1",
                params![id],
                row_to_listing,
            )
            .optional()?;
        Ok(listing)
    }

    fn count_listings(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM listings", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_listings_by_status(&self, status: ListingStatus) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM listings WHERE status = ?1",
            params![status.to_db_value()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO crawl_runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        listings_added: usize,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE crawl_runs SET finished_at = ?1, status = ?2, listings_added = ?3 WHERE id = ?4",
            params![now, status.to_db_string(), listings_added as i64, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status, listings_added
                 FROM crawl_runs WHERE id = ?1",
                params![run_id],
                row_to_run,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status, listings_added
                 FROM crawl_runs ORDER BY id DESC LIMIT 1",
                [],
                row_to_run,
            )
            .optional()?;
        Ok(run)
    }
}
