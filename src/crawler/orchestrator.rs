//! Scrape cycle orchestration
//!
//! One cycle clears the dataset, then runs a worker per configured category with at most
//! `max-concurrent-sessions` of them holding a rendering session at any time. The cycle
//! ends when every worker has finished or the run deadline fires; in the latter case the
//! remaining workers are told to stop, given a grace period to close their sessions, and
//! then aborted.

use crate::config::Config;
use crate::crawler::worker::{CategoryReport, CategoryWorker};
use crate::render::{EngineFactory, HttpRendererFactory};
use crate::state::WorkerOutcome;
use crate::storage::{self, share, RunStatus, SharedStorage, SqliteStorage, Storage};
use crate::SweepError;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

/// Outcome of one scrape cycle
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: i64,
    pub status: RunStatus,
    /// One report per configured category, in configuration order
    pub categories: Vec<CategoryReport>,
    pub elapsed: Duration,
}

impl RunReport {
    /// Returns true if every category ran out of pages normally
    pub fn is_complete(&self) -> bool {
        self.status == RunStatus::Completed
    }

    pub fn records_saved(&self) -> u64 {
        self.categories
            .iter()
            .map(|c| u64::from(c.records_saved))
            .sum()
    }

    pub fn category(&self, name: &str) -> Option<&CategoryReport> {
        self.categories.iter().find(|c| c.category == name)
    }
}

/// Runs scrape cycles against a store with sessions from a factory
pub struct Orchestrator {
    config: Arc<Config>,
    storage: SharedStorage,
    factory: Arc<dyn EngineFactory>,
    config_hash: String,
}

impl Orchestrator {
    pub fn new(config: Config, storage: SharedStorage, factory: Arc<dyn EngineFactory>) -> Self {
        Self {
            config: Arc::new(config),
            storage,
            factory,
            config_hash: String::new(),
        }
    }

    /// Sets the configuration hash recorded with each run
    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = hash.into();
        self
    }

    pub fn storage(&self) -> &SharedStorage {
        &self.storage
    }

    /// Runs one scrape cycle
    ///
    /// # Returns
    ///
    /// * `Ok(RunReport)` - Every category reached a terminal state or was stopped at the
    ///   deadline; category failures are reported, not returned
    /// * `Err(SweepError)` - The dataset could not be cleared or the run not recorded
    pub async fn run(&self) -> Result<RunReport, SweepError> {
        let started = Instant::now();

        storage::lock(&self.storage).clear()?;
        let run_id = storage::lock(&self.storage).create_run(&self.config_hash)?;

        let crawler = &self.config.crawler;
        tracing::info!(
            "Starting run {} over {} categories ({} concurrent sessions)",
            run_id,
            self.config.categories.len(),
            crawler.max_concurrent_sessions
        );

        let semaphore = Arc::new(Semaphore::new(crawler.max_concurrent_sessions as usize));
        let cancel = CancellationToken::new();
        let mut workers = JoinSet::new();

        for entry in &self.config.categories {
            let worker = CategoryWorker::new(
                entry.clone(),
                Arc::clone(&self.config),
                Arc::clone(&self.storage),
                cancel.clone(),
            );
            let name = entry.name.clone();
            let semaphore = Arc::clone(&semaphore);
            let factory = Arc::clone(&self.factory);
            let cancel = cancel.clone();

            workers.spawn(async move {
                let _permit = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        return CategoryReport::unstarted(name, WorkerOutcome::Cancelled);
                    }
                    permit = semaphore.acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(e) => {
                            return CategoryReport::unstarted(
                                name,
                                WorkerOutcome::Failed { reason: e.to_string() },
                            );
                        }
                    },
                };
                worker.run(factory.as_ref()).await
            });
        }

        let mut finished = HashMap::new();

        let deadline = tokio::time::sleep(crawler.run_deadline());
        tokio::pin!(deadline);
        loop {
            tokio::select! {
                joined = workers.join_next() => match joined {
                    Some(joined) => self.collect(run_id, joined, &mut finished),
                    None => break,
                },
                _ = &mut deadline => {
                    tracing::warn!(
                        "Run deadline of {:?} reached with {} categories unfinished",
                        crawler.run_deadline(),
                        workers.len()
                    );
                    cancel.cancel();
                    break;
                }
            }
        }

        if !workers.is_empty() {
            let grace = tokio::time::sleep(crawler.shutdown_grace());
            tokio::pin!(grace);
            loop {
                tokio::select! {
                    joined = workers.join_next() => match joined {
                        Some(joined) => self.collect(run_id, joined, &mut finished),
                        None => break,
                    },
                    _ = &mut grace => {
                        tracing::error!(
                            "Aborting {} workers that did not stop within {:?}",
                            workers.len(),
                            crawler.shutdown_grace()
                        );
                        workers.abort_all();
                        break;
                    }
                }
            }
            while let Some(joined) = workers.join_next().await {
                self.collect(run_id, joined, &mut finished);
            }
        }

        let categories: Vec<CategoryReport> = self
            .config
            .categories
            .iter()
            .map(|entry| {
                finished.remove(&entry.name).unwrap_or_else(|| {
                    let outcome = if cancel.is_cancelled() {
                        WorkerOutcome::Cancelled
                    } else {
                        WorkerOutcome::Failed {
                            reason: "worker task ended unexpectedly".to_string(),
                        }
                    };
                    let report = CategoryReport::unstarted(entry.name.clone(), outcome);
                    self.record(run_id, &report);
                    report
                })
            })
            .collect();

        let status = if categories.iter().all(|c| c.outcome.is_done()) {
            RunStatus::Completed
        } else {
            RunStatus::Partial
        };
        if let Err(e) = storage::lock(&self.storage).finish_run(run_id, status) {
            tracing::warn!("Failed to finalise run {}: {}", run_id, e);
        }

        let report = RunReport {
            run_id,
            status,
            categories,
            elapsed: started.elapsed(),
        };
        tracing::info!(
            "Run {} {}: {} records saved in {:?}",
            run_id,
            status,
            report.records_saved(),
            report.elapsed
        );

        Ok(report)
    }

    fn collect(
        &self,
        run_id: i64,
        joined: Result<CategoryReport, JoinError>,
        finished: &mut HashMap<String, CategoryReport>,
    ) {
        match joined {
            Ok(report) => {
                self.record(run_id, &report);
                finished.insert(report.category.clone(), report);
            }
            Err(e) if e.is_cancelled() => {}
            Err(e) => tracing::error!("Category worker panicked: {}", e),
        }
    }

    fn record(&self, run_id: i64, report: &CategoryReport) {
        if let Err(e) = storage::lock(&self.storage).record_category(run_id, report) {
            tracing::warn!(
                "Failed to record outcome of category '{}': {}",
                report.category,
                e
            );
        }
    }
}

/// Runs one scrape cycle with the HTTP renderer against the configured database
///
/// # Arguments
///
/// * `config` - The validated configuration
///
/// # Returns
///
/// * `Ok(RunReport)` - All categories terminated or the deadline fired
/// * `Err(SweepError)` - The database could not be opened or cleared
pub async fn run_scrape_cycle(config: Config) -> Result<RunReport, SweepError> {
    run_scrape_cycle_with_hash(config, "").await
}

/// Like [`run_scrape_cycle`], recording `config_hash` with the run
pub async fn run_scrape_cycle_with_hash(
    config: Config,
    config_hash: &str,
) -> Result<RunReport, SweepError> {
    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
    let factory = Arc::new(HttpRendererFactory::new(config.renderer.clone()));

    Orchestrator::new(config, share(storage), factory)
        .with_config_hash(config_hash)
        .run()
        .await
}
