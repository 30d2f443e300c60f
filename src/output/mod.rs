//! Output module for reporting on the scraped dataset
//!
//! This module handles:
//! - Printing dataset statistics
//! - Generating the markdown summary of the latest run

mod markdown;
pub mod stats;

pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use stats::{load_statistics, print_statistics, ProgramStatistics};

use crate::crawler::CategoryReport;
use crate::storage::{Storage, StorageError};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("No scrape runs found in database")]
    NoRuns,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Everything the markdown summary reports about a run
#[derive(Debug, Clone)]
pub struct RunSummary {
    // Run metadata
    pub run_id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub duration_seconds: Option<u64>,
    pub status: String,
    pub config_hash: String,

    /// Per-category outcomes in the order they were recorded
    pub categories: Vec<CategoryReport>,

    // Dataset
    pub stats: ProgramStatistics,
}

/// Builds the summary of the latest run from storage
///
/// # Arguments
///
/// * `storage` - The storage backend containing run data
///
/// # Returns
///
/// * `Ok(RunSummary)` - Successfully generated summary
/// * `Err(OutputError)` - No run recorded yet, or the query failed
pub fn generate_summary(storage: &dyn Storage) -> OutputResult<RunSummary> {
    let run = storage.get_latest_run()?.ok_or(OutputError::NoRuns)?;

    let duration_seconds = match (
        run.started_at.parse::<DateTime<Utc>>(),
        run.finished_at.as_deref().map(str::parse::<DateTime<Utc>>),
    ) {
        (Ok(started), Some(Ok(finished))) => Some((finished - started).num_seconds().max(0) as u64),
        _ => None,
    };

    let categories = storage.get_category_reports(run.id)?;
    let stats = load_statistics(storage)?;

    Ok(RunSummary {
        run_id: run.id,
        started_at: run.started_at,
        finished_at: run.finished_at,
        duration_seconds,
        status: run.status.to_db_string().to_string(),
        config_hash: run.config_hash,
        categories,
        stats,
    })
}
