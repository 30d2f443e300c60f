//! Category worker
//!
//! One worker drives one category from its first listing page to a terminal state with an
//! exclusive rendering session. The loop performs the work of the current
//! [`WorkerState`], turns the result into a [`StepEvent`] and lets [`transition`] pick the
//! next state.

use crate::config::{CategoryEntry, Config};
use crate::crawler::detail::fetch_tuition_fee;
use crate::crawler::pagination::PageWalker;
use crate::render::{EngineFactory, RenderError, RenderingEngine};
use crate::state::{transition, CrawlTask, StepEvent, WorkerOutcome, WorkerState};
use crate::storage::{self, SharedStorage, Storage};
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// How one category went
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryReport {
    pub category: String,
    pub outcome: WorkerOutcome,
    /// Last listing page whose items all went through detail fetch and persistence
    pub pages_fetched: u32,
    /// Listing items that reached the detail fetch
    pub records_extracted: u32,
    pub records_saved: u32,
    /// Records the store refused
    pub records_dropped: u32,
}

impl CategoryReport {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            outcome: WorkerOutcome::Done,
            pages_fetched: 0,
            records_extracted: 0,
            records_saved: 0,
            records_dropped: 0,
        }
    }

    /// Report for a category that never got to run
    pub fn unstarted(category: impl Into<String>, outcome: WorkerOutcome) -> Self {
        Self {
            outcome,
            ..Self::new(category)
        }
    }
}

/// Scrapes one category
pub struct CategoryWorker {
    category: CategoryEntry,
    config: Arc<Config>,
    storage: SharedStorage,
    cancel: CancellationToken,
}

impl CategoryWorker {
    pub fn new(
        category: CategoryEntry,
        config: Arc<Config>,
        storage: SharedStorage,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            category,
            config,
            storage,
            cancel,
        }
    }

    /// Runs the category to a terminal state
    ///
    /// The session opened here is closed before returning, whatever the outcome.
    pub async fn run(self, factory: &dyn EngineFactory) -> CategoryReport {
        let mut report = CategoryReport::new(&self.category.name);

        let opened = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                report.outcome = WorkerOutcome::Cancelled;
                return report;
            }
            opened = factory.open_session() => opened,
        };

        let mut engine = match opened {
            Ok(engine) => engine,
            Err(e) => {
                tracing::error!("[{}] Could not open a session: {}", self.category.name, e);
                report.outcome = WorkerOutcome::Failed {
                    reason: e.to_string(),
                };
                return report;
            }
        };

        let outcome = self.drive(engine.as_mut(), &mut report).await;
        report.outcome = outcome;

        if let Err(e) = engine.close().await {
            tracing::warn!("[{}] Failed to close session: {}", self.category.name, e);
        }

        match &report.outcome {
            WorkerOutcome::Done => tracing::info!(
                "[{}] Done: {} pages, {} records saved, {} dropped",
                report.category,
                report.pages_fetched,
                report.records_saved,
                report.records_dropped
            ),
            WorkerOutcome::Failed { reason } => tracing::error!(
                "[{}] Failed after {} pages: {}",
                report.category,
                report.pages_fetched,
                reason
            ),
            WorkerOutcome::Cancelled => tracing::warn!(
                "[{}] Cancelled after {} pages",
                report.category,
                report.pages_fetched
            ),
        }

        report
    }

    async fn drive(
        &self,
        engine: &mut dyn RenderingEngine,
        report: &mut CategoryReport,
    ) -> WorkerOutcome {
        let mut state = WorkerState::FetchingPage;
        let mut task = CrawlTask::new(&self.category.url, self.config.crawler.page_retries);
        // Items of the current page already persisted, by position and source URL, so a
        // retried page does not persist them twice while repeated listings still count
        let mut handled = HashSet::new();
        let mut needs_refresh = false;

        loop {
            if let Some(outcome) = state.outcome() {
                return outcome;
            }

            let event = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => StepEvent::Cancelled,
                event = self.step(engine, &state, &task, &mut handled, &mut needs_refresh, report) => {
                    event
                }
            };

            let retrying = matches!(event, StepEvent::Transient(_));
            let page = task.current_page();
            let (next_state, next_task) = transition(state, task, event);

            if next_task.current_page() != page {
                handled.clear();
            }
            if retrying && next_state == WorkerState::FetchingPage {
                tracing::warn!(
                    "[{}] Retrying page {} ({} retries left)",
                    self.category.name,
                    next_task.current_page(),
                    next_task.remaining_retries()
                );
                needs_refresh = true;
            }
            tracing::debug!(
                "[{}] {} on page {}",
                self.category.name,
                next_state,
                next_task.current_page()
            );

            state = next_state;
            task = next_task;
        }
    }

    async fn step(
        &self,
        engine: &mut dyn RenderingEngine,
        state: &WorkerState,
        task: &CrawlTask,
        handled: &mut HashSet<(usize, String)>,
        needs_refresh: &mut bool,
        report: &mut CategoryReport,
    ) -> StepEvent {
        let crawler = &self.config.crawler;
        let walker = PageWalker::new(&self.config.selectors, crawler.wait_timeout());

        match state {
            WorkerState::FetchingPage => {
                if *needs_refresh {
                    *needs_refresh = false;
                    // The page is loaded again right below, so a failed refresh only matters
                    // if navigation fails too
                    if let Err(e) = engine.refresh().await {
                        tracing::debug!("[{}] Refresh failed: {}", self.category.name, e);
                    }
                }
                tracing::info!("[{}] Fetching page {}", self.category.name, task.current_page());
                match walker
                    .fetch_page(engine, task.category_url(), task.current_page())
                    .await
                {
                    Ok(items) => StepEvent::PageFetched(items),
                    Err(e) => classify(e),
                }
            }

            WorkerState::ExtractingDetails(items) => {
                for (position, item) in items.iter().enumerate() {
                    let key = (position, item.source_url().unwrap_or_default().to_string());
                    if handled.contains(&key) {
                        tracing::debug!("[{}] Already handled {}", self.category.name, key.1);
                        continue;
                    }
                    let source_url = &key.1;

                    let fee = match fetch_tuition_fee(
                        engine,
                        source_url,
                        &self.config.selectors.tuition_fee,
                        crawler.wait_timeout(),
                    )
                    .await
                    {
                        Ok(fee) => fee,
                        Err(e) => return classify(e),
                    };

                    let record = item.clone().into_record(&self.category.name, fee);
                    report.records_extracted += 1;

                    let saved = storage::lock(&self.storage).save(&record);
                    match saved {
                        Ok(_) => report.records_saved += 1,
                        Err(e) => {
                            tracing::warn!(
                                "[{}] Dropping record {}: {}",
                                self.category.name,
                                source_url,
                                e
                            );
                            report.records_dropped += 1;
                        }
                    }
                    handled.insert(key);
                }
                report.pages_fetched = task.current_page();
                StepEvent::DetailsPersisted
            }

            WorkerState::CheckingNextPage => {
                match walker
                    .has_next_page(engine, task.category_url(), task.current_page())
                    .await
                {
                    Ok(more) => StepEvent::NextPageProbed(more),
                    Err(e) => classify(e),
                }
            }

            // The drive loop returns before stepping a terminal state
            WorkerState::Done | WorkerState::Failed { .. } | WorkerState::Cancelled => {
                StepEvent::Cancelled
            }
        }
    }
}

fn classify(err: RenderError) -> StepEvent {
    if err.is_transient() {
        StepEvent::Transient(err)
    } else {
        StepEvent::Fatal(err)
    }
}
