//! Statistics generation from the program database
//!
//! This module provides functionality for extracting and displaying
//! dataset statistics from the storage layer.

use crate::output::OutputResult;
use crate::program::NOT_AVAILABLE;
use crate::storage::{RunRecord, Storage};

/// Dataset statistics summary
#[derive(Debug, Clone, Default)]
pub struct ProgramStatistics {
    /// Total number of programs in the dataset
    pub total_programs: u64,

    /// Program counts per category, sorted by category name
    pub by_category: Vec<(String, u64)>,

    /// Program counts per degree type, most common first
    pub by_degree: Vec<(String, u64)>,

    /// Programs whose tuition fee could not be read
    pub missing_tuition: u64,

    /// The most recent run, if any
    pub latest_run: Option<RunRecord>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(ProgramStatistics)` - Successfully loaded statistics
/// * `Err(OutputError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> OutputResult<ProgramStatistics> {
    let missing_tuition = storage
        .list_programs()?
        .iter()
        .filter(|p| p.tuition_fee == NOT_AVAILABLE)
        .count() as u64;

    Ok(ProgramStatistics {
        total_programs: storage.count_programs()?,
        by_category: storage.count_by_category()?,
        by_degree: storage.count_by_degree()?,
        missing_tuition,
        latest_run: storage.get_latest_run()?,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &ProgramStatistics) {
    println!("=== Program Statistics ===\n");

    match &stats.latest_run {
        Some(run) => {
            println!("Latest Run:");
            println!("  ID: {}", run.id);
            println!("  Started: {}", run.started_at);
            if let Some(finished) = &run.finished_at {
                println!("  Finished: {}", finished);
            }
            println!("  Status: {}", run.status);
        }
        None => println!("No runs recorded yet."),
    }
    println!();

    println!("Overview:");
    println!("  Total programs: {}", stats.total_programs);
    println!(
        "  Without tuition fee: {} ({:.1}%)",
        stats.missing_tuition,
        percentage(stats.missing_tuition, stats.total_programs)
    );
    println!();

    if !stats.by_category.is_empty() {
        println!("Programs by Category:");
        for (category, count) in &stats.by_category {
            println!(
                "  {}: {} ({:.1}%)",
                category,
                count,
                percentage(*count, stats.total_programs)
            );
        }
        println!();
    }

    if !stats.by_degree.is_empty() {
        println!("Programs by Degree:");
        for (degree, count) in &stats.by_degree {
            let label = if degree.is_empty() { "(unspecified)" } else { degree };
            println!("  {}: {}", label, count);
        }
        println!();
    }
}

fn percentage(part: u64, total: u64) -> f64 {
    if total > 0 {
        (part as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}
