//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Edu-Sweep database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track scrape cycles
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL
);

-- The current dataset, replaced on every cycle
CREATE TABLE IF NOT EXISTS programs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    category TEXT NOT NULL,
    title TEXT NOT NULL,
    degree TEXT NOT NULL,
    university TEXT NOT NULL,
    location TEXT NOT NULL,
    pace TEXT NOT NULL,
    study_format TEXT NOT NULL,
    duration TEXT NOT NULL,
    languages TEXT NOT NULL,
    tuition_fee TEXT NOT NULL,
    source_url TEXT NOT NULL,
    scraped_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_programs_category ON programs(category);
CREATE INDEX IF NOT EXISTS idx_programs_source_url ON programs(source_url);

-- Per-category outcome of each cycle
CREATE TABLE IF NOT EXISTS category_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    category TEXT NOT NULL,
    outcome TEXT NOT NULL,
    reason TEXT,
    pages_fetched INTEGER NOT NULL DEFAULT 0,
    records_extracted INTEGER NOT NULL DEFAULT 0,
    records_saved INTEGER NOT NULL DEFAULT 0,
    records_dropped INTEGER NOT NULL DEFAULT 0,
    finished_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_category_runs_run ON category_runs(run_id);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
