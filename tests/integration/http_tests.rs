//! Scrape cycles through the HTTP renderer against mock servers

use crate::common::{item, listing_page, program_page, test_config};
use edu_sweep::crawler::run_scrape_cycle_with_hash;
use edu_sweep::storage::{RunStatus, SqliteStorage, Storage};
use edu_sweep::{WorkerOutcome, NOT_AVAILABLE};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_html(server: &MockServer, route: &str, page: Option<&str>, body: String) {
    let mut mock = Mock::given(method("GET")).and(path(route));
    if let Some(page) = page {
        mock = mock.and(query_param("page", page));
    }
    mock.respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html"))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_http_cycle_persists_programs() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_html(
        &server,
        "/masters",
        Some("1"),
        listing_page(
            &[
                item("ai", &[("Degree type", "Master"), ("Study pace", "Full-time")]),
                item("ml", &[("Degree type", "Master")]),
            ],
            true,
        ),
    )
    .await;
    mount_html(&server, "/masters", Some("2"), listing_page(&[], false)).await;
    mount_html(&server, "/programs/ai", None, program_page("EUR 12,000")).await;
    // No mock for /programs/ml: the server answers 404 with an empty body

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("programs.db");
    let masters = format!("{}/masters", base);
    let mut config = test_config(&[("masters", masters.as_str())]);
    config.output.database_path = db_path.to_string_lossy().into_owned();

    let report = run_scrape_cycle_with_hash(config, "hash123").await.unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.category("masters").unwrap().outcome, WorkerOutcome::Done);
    assert_eq!(report.records_saved(), 2);

    let storage = SqliteStorage::new(&db_path).unwrap();
    let programs = storage.list_programs().unwrap();
    assert_eq!(programs.len(), 2);
    assert_eq!(programs[0].source_url, format!("{}/programs/ai", base));
    assert_eq!(programs[0].tuition_fee, "EUR 12,000");
    assert_eq!(programs[0].pace, "Full-time");
    assert_eq!(programs[1].tuition_fee, NOT_AVAILABLE);
    assert_eq!(programs[1].pace, "");

    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.config_hash, "hash123");
    assert_eq!(run.status, RunStatus::Completed);
}

#[tokio::test]
async fn test_unreachable_portal_fails_category() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("programs.db");
    // Nothing listens on port 9 of the loopback interface
    let mut config = test_config(&[("phd", "http://127.0.0.1:9/phd")]);
    config.output.database_path = db_path.to_string_lossy().into_owned();

    let report = run_scrape_cycle_with_hash(config, "hash").await.unwrap();

    assert!(matches!(
        report.category("phd").unwrap().outcome,
        WorkerOutcome::Failed { .. }
    ));
    assert_eq!(report.status, RunStatus::Partial);
}
