//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::crawler::CategoryReport;
use crate::program::ProgramRecord;
use crate::state::WorkerOutcome;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus};
use crate::SweepError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

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
    /// * `Err(SweepError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, SweepError> {
        let conn = Connection::open(path)?;

        // Workers insert concurrently with readers of the previous dataset
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, SweepError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?).unwrap_or(RunStatus::Running),
    })
}

fn program_from_row(row: &Row<'_>) -> rusqlite::Result<ProgramRecord> {
    Ok(ProgramRecord {
        id: Some(row.get(0)?),
        category: row.get(1)?,
        title: row.get(2)?,
        degree: row.get(3)?,
        university: row.get(4)?,
        location: row.get(5)?,
        pace: row.get(6)?,
        study_format: row.get(7)?,
        duration: row.get(8)?,
        languages: row.get(9)?,
        tuition_fee: row.get(10)?,
        source_url: row.get(11)?,
    })
}

impl Storage for SqliteStorage {
    // ===== Dataset =====

    fn clear(&mut self) -> StorageResult<()> {
        let removed = self.conn.execute("DELETE FROM programs", [])?;
        tracing::debug!("Cleared {} programs from the dataset", removed);
        Ok(())
    }

    fn save(&mut self, record: &ProgramRecord) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO programs (category, title, degree, university, location, pace,
             study_format, duration, languages, tuition_fee, source_url, scraped_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                record.category,
                record.title,
                record.degree,
                record.university,
                record.location,
                record.pace,
                record.study_format,
                record.duration,
                record.languages,
                record.tuition_fee,
                record.source_url,
                now
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn list_programs(&self) -> StorageResult<Vec<ProgramRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, category, title, degree, university, location, pace, study_format,
             duration, languages, tuition_fee, source_url
             FROM programs ORDER BY id",
        )?;

        let programs = stmt
            .query_map([], program_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(programs)
    }

    fn count_programs(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM programs", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_by_category(&self) -> StorageResult<Vec<(String, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT category, COUNT(*) FROM programs GROUP BY category ORDER BY category",
        )?;

        let counts = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(counts)
    }

    fn count_by_degree(&self) -> StorageResult<Vec<(String, u64)>> {
        let query = "
            SELECT degree, COUNT(*) as count
            FROM programs
            GROUP BY degree
            ORDER BY count DESC, degree
        ";

        let mut stmt = self.conn.prepare(query)?;
        let counts = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(counts)
    }

    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status FROM runs WHERE id = ?1",
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status FROM runs ORDER BY id DESC LIMIT 1",
                [],
                run_from_row,
            )
            .optional()?;

        Ok(run)
    }

    fn record_category(&mut self, run_id: i64, report: &CategoryReport) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO category_runs (run_id, category, outcome, reason, pages_fetched,
             records_extracted, records_saved, records_dropped, finished_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                run_id,
                report.category,
                report.outcome.to_db_string(),
                report.outcome.reason(),
                report.pages_fetched,
                report.records_extracted,
                report.records_saved,
                report.records_dropped,
                now
            ],
        )?;
        Ok(())
    }

    fn get_category_reports(&self, run_id: i64) -> StorageResult<Vec<CategoryReport>> {
        let mut stmt = self.conn.prepare(
            "SELECT category, outcome, reason, pages_fetched, records_extracted,
             records_saved, records_dropped
             FROM category_runs WHERE run_id = ?1 ORDER BY id",
        )?;

        let rows = stmt.query_map(params![run_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                CategoryReport {
                    category: String::new(),
                    outcome: WorkerOutcome::Done,
                    pages_fetched: row.get(3)?,
                    records_extracted: row.get(4)?,
                    records_saved: row.get(5)?,
                    records_dropped: row.get(6)?,
                },
            ))
        })?;

        let mut reports = Vec::new();
        for row in rows {
            let (category, outcome, reason, report) = row?;
            let outcome = WorkerOutcome::from_db(&outcome, reason).ok_or_else(|| {
                StorageError::Database(format!("unknown category outcome '{}'", outcome))
            })?;
            reports.push(CategoryReport {
                category,
                outcome,
                ..report
            });
        }

        Ok(reports)
    }
}
