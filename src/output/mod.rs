//! Output module for reporting on the listing database
//!
//! This module handles:
//! - Loading listing and run statistics from storage
//! - Printing them for the `--stats` command

pub mod stats;

pub use stats::{load_statistics, print_statistics, ListingStatistics};
