//! Retry, isolation, cancellation and storage failure behavior

use crate::common::{item, listing_page, orchestrator, program_url, stored, test_config};
use edu_sweep::crawler::{CategoryReport, Orchestrator};
use edu_sweep::render::{Fault, FixtureFactory, FixtureSite};
use edu_sweep::storage::{share, RunRecord, RunStatus, SqliteStorage, Storage, StorageError, StorageResult};
use edu_sweep::{ProgramRecord, SweepError, WorkerOutcome};
use std::sync::Arc;
use std::time::{Duration, Instant};

const BASE: &str = "https://example.test";
const BACHELORS: &str = "https://example.test/bachelors";
const PHD: &str = "https://example.test/phd";
const LISTING: &str = "#results > li";

fn page(category: &str, n: u32) -> String {
    format!("{}?page={}", category, n)
}

fn two_page_site(category: &str) -> FixtureSite {
    FixtureSite::new()
        .with_page(&page(category, 1), listing_page(&[item("a", &[])], true))
        .with_page(&page(category, 2), listing_page(&[item("b", &[])], false))
}

fn stale_listing(category: &str, times: u32) -> Fault {
    Fault::StaleWait {
        url: page(category, 1),
        selector: LISTING.to_string(),
        times,
    }
}

#[tokio::test]
async fn test_stale_listing_below_budget_recovers() {
    let site = two_page_site(BACHELORS).with_fault(stale_listing(BACHELORS, 2));

    let (orchestrator, storage) = orchestrator(test_config(&[("bachelors", BACHELORS)]), &site);
    let report = orchestrator.run().await.unwrap();

    assert_eq!(report.category("bachelors").unwrap().outcome, WorkerOutcome::Done);
    assert_eq!(stored(&storage).len(), 2);
    assert_eq!(report.status, RunStatus::Completed);
}

#[tokio::test]
async fn test_stale_listing_at_budget_fails_category() {
    let site = two_page_site(BACHELORS).with_fault(stale_listing(BACHELORS, 3));

    let (orchestrator, storage) = orchestrator(test_config(&[("bachelors", BACHELORS)]), &site);
    let report = orchestrator.run().await.unwrap();

    let bachelors = report.category("bachelors").unwrap();
    assert!(matches!(bachelors.outcome, WorkerOutcome::Failed { .. }));
    assert_eq!(bachelors.pages_fetched, 0);
    assert!(stored(&storage).is_empty());
    assert_eq!(site.visits(&page(BACHELORS, 2)), 0);
    assert_eq!(report.status, RunStatus::Partial);
    assert_eq!(site.sessions_closed(), 1);
}

#[tokio::test]
async fn test_retry_budget_resets_per_page() {
    // Two stale waits on each page stay under the budget of three
    let site = two_page_site(BACHELORS)
        .with_fault(stale_listing(BACHELORS, 2))
        .with_fault(Fault::StaleWait {
            url: page(BACHELORS, 2),
            selector: LISTING.to_string(),
            times: 2,
        });

    let (orchestrator, storage) = orchestrator(test_config(&[("bachelors", BACHELORS)]), &site);
    let report = orchestrator.run().await.unwrap();

    assert_eq!(report.category("bachelors").unwrap().outcome, WorkerOutcome::Done);
    assert_eq!(stored(&storage).len(), 2);
}

fn stale_detail(slug: &str, times: u32) -> Fault {
    Fault::StaleOnNavigate {
        url: program_url(BASE, slug),
        times,
    }
}

#[tokio::test]
async fn test_stale_detail_navigation_refetches_page_once_per_record() {
    let site = FixtureSite::new()
        .with_page(
            &page(BACHELORS, 1),
            listing_page(&[item("a", &[]), item("b", &[])], false),
        )
        .with_fault(stale_detail("b", 1));

    let (orchestrator, storage) = orchestrator(test_config(&[("bachelors", BACHELORS)]), &site);
    let report = orchestrator.run().await.unwrap();

    let bachelors = report.category("bachelors").unwrap();
    assert_eq!(bachelors.outcome, WorkerOutcome::Done);
    assert_eq!(bachelors.records_saved, 2);

    let mut urls: Vec<String> = stored(&storage).into_iter().map(|r| r.source_url).collect();
    urls.sort();
    assert_eq!(urls, vec![program_url(BASE, "a"), program_url(BASE, "b")]);

    // Initial fetch, refetch after the stale detail, next-page probe
    assert_eq!(site.visits(&page(BACHELORS, 1)), 3);
    assert_eq!(site.visits(&program_url(BASE, "b")), 2);
}

#[tokio::test]
async fn test_stale_detail_navigation_at_budget_fails_category() {
    let site = two_page_site(BACHELORS).with_fault(stale_detail("a", 3));

    let (orchestrator, storage) = orchestrator(test_config(&[("bachelors", BACHELORS)]), &site);
    let report = orchestrator.run().await.unwrap();

    let bachelors = report.category("bachelors").unwrap();
    assert!(matches!(bachelors.outcome, WorkerOutcome::Failed { .. }));
    assert_eq!(bachelors.pages_fetched, 0);
    assert!(stored(&storage).is_empty());
    assert_eq!(site.visits(&program_url(BASE, "a")), 3);
    assert_eq!(site.visits(&page(BACHELORS, 2)), 0);
    assert_eq!(site.sessions_closed(), 1);
    assert_eq!(report.status, RunStatus::Partial);
}

#[tokio::test]
async fn test_driver_error_is_isolated_to_its_category() {
    let site = two_page_site(BACHELORS)
        .with_page(&page(PHD, 1), listing_page(&[item("x", &[])], false))
        .with_fault(Fault::DriverOnNavigate { url: page(PHD, 1) });

    let (orchestrator, storage) = orchestrator(
        test_config(&[("bachelors", BACHELORS), ("phd", PHD)]),
        &site,
    );
    let report = orchestrator.run().await.unwrap();

    assert_eq!(report.category("bachelors").unwrap().outcome, WorkerOutcome::Done);
    match &report.category("phd").unwrap().outcome {
        WorkerOutcome::Failed { reason } => assert!(reason.contains("Driver error")),
        other => panic!("expected phd to fail, got {:?}", other),
    }

    let records = stored(&storage);
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.category == "bachelors"));
    assert_eq!(report.status, RunStatus::Partial);
    assert_eq!(site.sessions_opened(), 2);
    assert_eq!(site.sessions_closed(), 2);
}

#[tokio::test]
async fn test_deadline_cancels_and_releases_sessions() {
    let site = FixtureSite::new()
        .with_page(&page(PHD, 1), listing_page(&[item("x", &[])], false))
        .with_fault(Fault::SlowNavigate {
            url: page(PHD, 1),
            delay: Duration::from_secs(60),
        });

    let mut config = test_config(&[("phd", PHD)]);
    config.crawler.run_deadline_secs = 1;
    config.crawler.shutdown_grace_secs = 5;
    let (orchestrator, storage) = orchestrator(config, &site);

    let started = Instant::now();
    let report = orchestrator.run().await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(report.category("phd").unwrap().outcome, WorkerOutcome::Cancelled);
    assert_eq!(report.status, RunStatus::Partial);
    assert!(stored(&storage).is_empty());
    assert_eq!(site.sessions_opened(), 1);
    assert_eq!(site.sessions_closed(), 1);
}

/// Delegates to SQLite but can refuse to clear or to save particular programs
struct FlakyStorage {
    inner: SqliteStorage,
    fail_clear: bool,
    refuse_url: Option<String>,
}

impl FlakyStorage {
    fn new() -> Self {
        Self {
            inner: SqliteStorage::new_in_memory().unwrap(),
            fail_clear: false,
            refuse_url: None,
        }
    }
}

impl Storage for FlakyStorage {
    fn clear(&mut self) -> StorageResult<()> {
        if self.fail_clear {
            return Err(StorageError::Database("database is locked".to_string()));
        }
        self.inner.clear()
    }

    fn save(&mut self, record: &ProgramRecord) -> StorageResult<i64> {
        if self.refuse_url.as_deref() == Some(record.source_url.as_str()) {
            return Err(StorageError::Database("disk I/O error".to_string()));
        }
        self.inner.save(record)
    }

    fn list_programs(&self) -> StorageResult<Vec<ProgramRecord>> {
        self.inner.list_programs()
    }

    fn count_programs(&self) -> StorageResult<u64> {
        self.inner.count_programs()
    }

    fn count_by_category(&self) -> StorageResult<Vec<(String, u64)>> {
        self.inner.count_by_category()
    }

    fn count_by_degree(&self) -> StorageResult<Vec<(String, u64)>> {
        self.inner.count_by_degree()
    }

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        self.inner.create_run(config_hash)
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        self.inner.finish_run(run_id, status)
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.inner.get_run(run_id)
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        self.inner.get_latest_run()
    }

    fn record_category(&mut self, run_id: i64, report: &CategoryReport) -> StorageResult<()> {
        self.inner.record_category(run_id, report)
    }

    fn get_category_reports(&self, run_id: i64) -> StorageResult<Vec<CategoryReport>> {
        self.inner.get_category_reports(run_id)
    }
}

#[tokio::test]
async fn test_clear_failure_aborts_run() {
    let site = two_page_site(BACHELORS);
    let storage = share(FlakyStorage {
        fail_clear: true,
        ..FlakyStorage::new()
    });
    let orchestrator = Orchestrator::new(
        test_config(&[("bachelors", BACHELORS)]),
        storage,
        Arc::new(FixtureFactory::new(site.clone())),
    );

    let result = orchestrator.run().await;

    assert!(matches!(result, Err(SweepError::Storage(_))));
    assert_eq!(site.sessions_opened(), 0);
    assert!(site.navigations().is_empty());
}

#[tokio::test]
async fn test_save_failure_drops_only_that_record() {
    let site = two_page_site(BACHELORS);
    let storage = share(FlakyStorage {
        refuse_url: Some(program_url(BASE, "a")),
        ..FlakyStorage::new()
    });
    let orchestrator = Orchestrator::new(
        test_config(&[("bachelors", BACHELORS)]),
        storage.clone(),
        Arc::new(FixtureFactory::new(site.clone())),
    );

    let report = orchestrator.run().await.unwrap();

    let bachelors = report.category("bachelors").unwrap();
    assert_eq!(bachelors.outcome, WorkerOutcome::Done);
    assert_eq!(bachelors.records_extracted, 2);
    assert_eq!(bachelors.records_saved, 1);
    assert_eq!(bachelors.records_dropped, 1);

    let records = stored(&storage);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].source_url, program_url(BASE, "b"));
}
