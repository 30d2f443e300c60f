//! Storage module for persisting scraped programs
//!
//! This module handles all database operations for the scraper, including:
//! - SQLite database initialization and schema management
//! - The program dataset, replaced wholesale on every cycle
//! - Run and per-category outcome tracking

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use std::sync::{Arc, Mutex, MutexGuard};

/// Storage backend shared by the orchestrator and its workers
pub type SharedStorage = Arc<Mutex<Box<dyn Storage + Send>>>;

/// Wraps a backend for sharing across workers
pub fn share<S: Storage + Send + 'static>(storage: S) -> SharedStorage {
    Arc::new(Mutex::new(Box::new(storage)))
}

/// Locks a shared backend
///
/// A worker that panicked mid-write leaves at most one unfinished statement, which SQLite
/// has already rolled back, so a poisoned lock is still safe to use.
pub fn lock(storage: &SharedStorage) -> MutexGuard<'_, Box<dyn Storage + Send>> {
    storage.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Represents a scrape run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}

/// Status of a scrape run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Workers are still active, or the process died before finishing the run
    Running,
    /// Every category finished with no more pages
    Completed,
    /// At least one category failed or was cancelled
    Partial,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Partial => "partial",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "partial" => Some(Self::Partial),
            _ => None,
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_db_string())
    }
}
