//! Edu-Sweep: a scheduled scraper for education program listings
//!
//! This crate crawls the category listing pages of an education portal, walks each
//! category's pagination, extracts program records (with a per-program detail visit for
//! the tuition fee) and replaces a SQLite dataset with the fresh results on every cycle.

pub mod config;
pub mod crawler;
pub mod output;
pub mod program;
pub mod render;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Edu-Sweep operations
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Rendering error: {0}")]
    Render(#[from] render::RenderError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },
}

/// Result type alias for Edu-Sweep operations
pub type Result<T> = std::result::Result<T, SweepError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{run_scrape_cycle, Orchestrator, RunReport};
pub use program::{ExtractionResult, ProgramRecord, NOT_AVAILABLE};
pub use state::{CrawlTask, WorkerOutcome, WorkerState};
