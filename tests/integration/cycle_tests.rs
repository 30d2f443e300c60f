//! Full scrape cycles over well-behaved fixture sites

use crate::common::{item, listing_page, orchestrator, program_page, program_url, stored, test_config};
use edu_sweep::render::{Fault, FixtureSite};
use edu_sweep::storage::{self, RunStatus, Storage};
use edu_sweep::{WorkerOutcome, NOT_AVAILABLE};

const BASE: &str = "https://example.test";
const BACHELORS: &str = "https://example.test/bachelors";

fn page(category: &str, n: u32) -> String {
    format!("{}?page={}", category, n)
}

#[tokio::test]
async fn test_end_to_end_bachelors() {
    let first = item(
        "cs",
        &[
            ("Degree type", "Bachelor"),
            ("Study pace", "Full-time"),
            ("Duration", "3 years"),
            ("Study format", "On-Campus"),
            ("Language", "English"),
        ],
    );
    let second = item("law", &[("Degree type", "Bachelor"), ("Duration", "4 years")]);

    let site = FixtureSite::new()
        .with_page(&page(BACHELORS, 1), listing_page(&[first, second], true))
        .with_page(&page(BACHELORS, 2), listing_page(&[], false))
        .with_page(&program_url(BASE, "cs"), program_page("SEK 145,000"))
        .with_page(&program_url(BASE, "law"), program_page("SEK 120,000"));

    let (orchestrator, storage) = orchestrator(test_config(&[("bachelors", BACHELORS)]), &site);
    let report = orchestrator.run().await.unwrap();

    let records = stored(&storage);
    assert_eq!(records.len(), 2);

    assert_eq!(records[0].category, "bachelors");
    assert_eq!(records[0].title, "Program cs");
    assert_eq!(records[0].university, "University of cs");
    assert_eq!(records[0].location, "City of cs");
    assert_eq!(records[0].degree, "Bachelor");
    assert_eq!(records[0].pace, "Full-time");
    assert_eq!(records[0].study_format, "On-Campus");
    assert_eq!(records[0].languages, "English");
    assert_eq!(records[0].tuition_fee, "SEK 145,000");
    assert_eq!(records[0].source_url, program_url(BASE, "cs"));

    assert_eq!(records[1].title, "Program law");
    assert_eq!(records[1].pace, "");
    assert_eq!(records[1].duration, "4 years");

    let bachelors = report.category("bachelors").unwrap();
    assert_eq!(bachelors.outcome, WorkerOutcome::Done);
    assert_eq!(bachelors.records_saved, 2);
    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(site.visits(&page(BACHELORS, 2)), 1);
    assert_eq!(site.visits(&page(BACHELORS, 3)), 0);
    assert_eq!(site.sessions_closed(), site.sessions_opened());
}

#[tokio::test]
async fn test_two_pages_yield_union_once() {
    let site = FixtureSite::new()
        .with_page(
            &page(BACHELORS, 1),
            listing_page(&[item("a", &[]), item("b", &[])], true),
        )
        .with_page(
            &page(BACHELORS, 2),
            listing_page(&[item("c", &[]), item("d", &[])], false),
        );

    let (orchestrator, storage) = orchestrator(test_config(&[("bachelors", BACHELORS)]), &site);
    let report = orchestrator.run().await.unwrap();

    let urls: Vec<String> = stored(&storage).into_iter().map(|r| r.source_url).collect();
    let expected: Vec<String> = ["a", "b", "c", "d"]
        .iter()
        .map(|slug| program_url(BASE, slug))
        .collect();
    assert_eq!(urls, expected);

    let bachelors = report.category("bachelors").unwrap();
    assert_eq!(bachelors.pages_fetched, 2);
    assert_eq!(bachelors.records_extracted, 4);
    assert_eq!(bachelors.records_saved, 4);
}

#[tokio::test]
async fn test_clear_replaces_previous_dataset() {
    let site = FixtureSite::new().with_page(&page(BACHELORS, 1), listing_page(&[item("a", &[])], false));
    let (orchestrator, storage) = orchestrator(test_config(&[("bachelors", BACHELORS)]), &site);

    orchestrator.run().await.unwrap();
    orchestrator.run().await.unwrap();

    assert_eq!(stored(&storage).len(), 1);
    let latest = storage::lock(&storage).get_latest_run().unwrap().unwrap();
    assert_eq!(latest.id, 2);
    assert_eq!(latest.config_hash, "test_hash");
    assert_eq!(latest.status, RunStatus::Completed);
}

#[tokio::test]
async fn test_pagination_stops_without_next_control() {
    let site = FixtureSite::new()
        .with_page(&page(BACHELORS, 1), listing_page(&[item("a", &[])], true))
        .with_page(&page(BACHELORS, 2), listing_page(&[item("b", &[])], false))
        .with_page(&page(BACHELORS, 3), listing_page(&[item("c", &[])], false));

    let (orchestrator, storage) = orchestrator(test_config(&[("bachelors", BACHELORS)]), &site);
    let report = orchestrator.run().await.unwrap();

    assert_eq!(stored(&storage).len(), 2);
    assert_eq!(report.category("bachelors").unwrap().pages_fetched, 2);
    assert_eq!(site.visits(&page(BACHELORS, 3)), 0);
}

#[tokio::test]
async fn test_detail_timeout_keeps_record_with_sentinel() {
    let site = FixtureSite::new()
        .with_page(&page(BACHELORS, 1), listing_page(&[item("a", &[])], false))
        .with_page(&program_url(BASE, "a"), program_page("EUR 9,000"))
        .with_fault(Fault::TimeoutWait {
            url: program_url(BASE, "a"),
            selector: ".max-w-40".to_string(),
        });

    let (orchestrator, storage) = orchestrator(test_config(&[("bachelors", BACHELORS)]), &site);
    orchestrator.run().await.unwrap();

    let records = stored(&storage);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].tuition_fee, NOT_AVAILABLE);
}

#[tokio::test]
async fn test_items_missing_required_fields_are_skipped() {
    let broken = r#"<li><h3>Orphan</h3></li>"#.to_string();
    let site = FixtureSite::new().with_page(
        &page(BACHELORS, 1),
        listing_page(&[item("a", &[]), broken, item("b", &[])], false),
    );

    let (orchestrator, storage) = orchestrator(test_config(&[("bachelors", BACHELORS)]), &site);
    let report = orchestrator.run().await.unwrap();

    let titles: Vec<String> = stored(&storage).into_iter().map(|r| r.title).collect();
    assert_eq!(titles, vec!["Program a", "Program b"]);
    assert_eq!(report.status, RunStatus::Completed);
}

#[tokio::test]
async fn test_concurrency_is_bounded() {
    let categories = ["bachelors", "masters", "mba", "phd"];
    let site = FixtureSite::new();
    let mut entries = Vec::new();
    for name in categories {
        let url = format!("{}/{}", BASE, name);
        site.add_page(&page(&url, 1), listing_page(&[item(name, &[])], false));
        site.add_fault(Fault::SlowNavigate {
            url: page(&url, 1),
            delay: std::time::Duration::from_millis(50),
        });
        entries.push((name, url));
    }
    let entries: Vec<(&str, &str)> = entries.iter().map(|(n, u)| (*n, u.as_str())).collect();

    let mut config = test_config(&entries);
    config.crawler.max_concurrent_sessions = 2;
    let (orchestrator, storage) = orchestrator(config, &site);
    let report = orchestrator.run().await.unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(stored(&storage).len(), 4);
    assert_eq!(site.sessions_opened(), 4);
    assert!(site.peak_open_sessions() <= 2);

    // Reports follow configuration order
    let names: Vec<&str> = report.categories.iter().map(|c| c.category.as_str()).collect();
    assert_eq!(names, categories);

    let recorded = storage::lock(&storage).get_category_reports(report.run_id).unwrap();
    assert_eq!(recorded.len(), 4);
}

#[tokio::test]
async fn test_repeated_listing_entries_are_all_persisted() {
    // A promoted slot repeats a program that also appears in its normal position
    let items = [item("a", &[]), item("a", &[]), item("b", &[])];
    let site = FixtureSite::new()
        .with_page(&page(BACHELORS, 1), listing_page(&items, false))
        .with_page(&program_url(BASE, "a"), program_page("SEK 90,000"))
        .with_page(&program_url(BASE, "b"), program_page("SEK 80,000"));

    let (orchestrator, storage) = orchestrator(test_config(&[("bachelors", BACHELORS)]), &site);
    let report = orchestrator.run().await.unwrap();

    let bachelors = report.category("bachelors").unwrap();
    assert_eq!(bachelors.outcome, WorkerOutcome::Done);
    assert_eq!(bachelors.records_extracted, 3);
    assert_eq!(bachelors.records_saved, 3);

    let urls: Vec<String> = stored(&storage).into_iter().map(|r| r.source_url).collect();
    assert_eq!(
        urls,
        vec![
            program_url(BASE, "a"),
            program_url(BASE, "a"),
            program_url(BASE, "b"),
        ]
    );
}
