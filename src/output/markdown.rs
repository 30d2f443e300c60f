//! Markdown summary generation
//!
//! This module generates a human-readable markdown summary of the latest run:
//! run metadata, per-category outcomes and the shape of the resulting dataset.

use crate::output::{OutputResult, RunSummary};
use crate::state::WorkerOutcome;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes the markdown summary of a run
///
/// # Arguments
///
/// * `summary` - The run summary data
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(OutputError)` - Failed to write summary
pub fn generate_markdown_summary(summary: &RunSummary, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_summary(summary);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a run summary as markdown
pub fn format_markdown_summary(summary: &RunSummary) -> String {
    let mut md = String::new();

    md.push_str("# Edu-Sweep Run Summary\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Run ID**: {}\n", summary.run_id));
    md.push_str(&format!("- **Started**: {}\n", summary.started_at));
    if let Some(finished) = &summary.finished_at {
        md.push_str(&format!("- **Finished**: {}\n", finished));
    }
    if let Some(duration) = summary.duration_seconds {
        md.push_str(&format!(
            "- **Duration**: {} seconds ({:.2} minutes)\n",
            duration,
            duration as f64 / 60.0
        ));
    }
    md.push_str(&format!("- **Status**: {}\n", summary.status));
    md.push_str(&format!("- **Config Hash**: {}\n\n", summary.config_hash));

    // Category outcomes
    if !summary.categories.is_empty() {
        md.push_str("## Categories\n\n");
        md.push_str("| Category | Outcome | Pages | Saved | Dropped |\n");
        md.push_str("|----------|---------|-------|-------|---------|\n");
        for category in &summary.categories {
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                category.category,
                category.outcome.to_db_string(),
                category.pages_fetched,
                category.records_saved,
                category.records_dropped
            ));
        }
        md.push('\n');

        let failures: Vec<_> = summary
            .categories
            .iter()
            .filter_map(|c| match &c.outcome {
                WorkerOutcome::Failed { reason } => Some((&c.category, reason)),
                _ => None,
            })
            .collect();
        if !failures.is_empty() {
            md.push_str("### Failures\n\n");
            for (category, reason) in failures {
                md.push_str(&format!("- **{}**: {}\n", category, reason));
            }
            md.push('\n');
        }
    }

    // Dataset
    let stats = &summary.stats;
    md.push_str("## Dataset\n\n");
    md.push_str(&format!("- **Total Programs**: {}\n", stats.total_programs));
    md.push_str(&format!(
        "- **Without Tuition Fee**: {}\n\n",
        stats.missing_tuition
    ));

    if !stats.by_degree.is_empty() {
        md.push_str("| Degree | Programs |\n");
        md.push_str("|--------|----------|\n");
        for (degree, count) in stats.by_degree.iter().take(20) {
            let label = if degree.is_empty() { "(unspecified)" } else { degree };
            md.push_str(&format!("| {} | {} |\n", label, count));
        }
        md.push('\n');
    }

    md
}
