//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::crawler::CategoryReport;
use crate::program::ProgramRecord;
use crate::storage::{RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// This trait defines all database operations needed by the scraper. Workers share one
/// backend behind a mutex, so every write is a single short statement.
pub trait Storage {
    // ===== Dataset =====

    /// Removes every program from the dataset
    ///
    /// Run history is kept. Called once at the start of a cycle, before any worker starts.
    fn clear(&mut self) -> StorageResult<()>;

    /// Persists one fully resolved program
    ///
    /// # Returns
    ///
    /// The row id assigned to the record
    fn save(&mut self, record: &ProgramRecord) -> StorageResult<i64>;

    /// Gets all programs in insertion order
    fn list_programs(&self) -> StorageResult<Vec<ProgramRecord>>;

    /// Gets total program count
    fn count_programs(&self) -> StorageResult<u64>;

    /// Program counts per category, sorted by category name
    fn count_by_category(&self) -> StorageResult<Vec<(String, u64)>>;

    /// Program counts per degree type, most common first
    fn count_by_degree(&self) -> StorageResult<Vec<(String, u64)>>;

    // ===== Run Management =====

    /// Creates a new scrape run
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Sets the final status of a run and stamps its finish time
    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Records how one category of a run ended
    fn record_category(&mut self, run_id: i64, report: &CategoryReport) -> StorageResult<()>;

    /// Gets the category reports of a run in the order they were recorded
    fn get_category_reports(&self, run_id: i64) -> StorageResult<Vec<CategoryReport>>;
}
