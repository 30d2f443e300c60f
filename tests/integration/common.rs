//! Shared fixtures for the integration tests

use edu_sweep::config::{
    CategoryEntry, Config, CrawlerConfig, OutputConfig, RendererConfig, SelectorConfig,
};
use edu_sweep::render::{FixtureFactory, FixtureSite};
use edu_sweep::storage::{self, share, SharedStorage, SqliteStorage, Storage};
use edu_sweep::{Orchestrator, ProgramRecord};
use std::sync::Arc;

/// Creates a test configuration with short waits for the given `(name, url)` categories
pub fn test_config(categories: &[(&str, &str)]) -> Config {
    Config {
        crawler: CrawlerConfig {
            max_concurrent_sessions: 4,
            wait_timeout_secs: 1,
            run_deadline_secs: 30,
            page_retries: 3,
            shutdown_grace_secs: 5,
        },
        renderer: RendererConfig::default(),
        selectors: SelectorConfig::default(),
        output: OutputConfig {
            database_path: "unused.db".to_string(),
            summary_path: "unused.md".to_string(),
        },
        categories: categories
            .iter()
            .map(|(name, url)| CategoryEntry {
                name: name.to_string(),
                url: url.to_string(),
            })
            .collect(),
    }
}

/// One listing item linking to `/programs/<slug>`
///
/// `details` are `(aria-label, value)` pairs for the info block; an empty slice leaves the
/// block out entirely.
pub fn item(slug: &str, details: &[(&str, &str)]) -> String {
    let info = if details.is_empty() {
        String::new()
    } else {
        let entries: String = details
            .iter()
            .map(|(label, value)| {
                format!(r#"<div class="info"><div aria-label="{label}"></div><p>{value}</p></div>"#)
            })
            .collect();
        format!(r#"<div class="program-info">{entries}</div>"#)
    };

    format!(
        r#"<li>
          <a class="block cursor-pointer" href="/programs/{slug}">{slug}</a>
          <p class="sm mb-2 md:mr-16">University of {slug}</p>
          <h3>Program {slug}</h3>
          <div class="location"><ul><li>City of {slug}</li></ul></div>
          {info}
        </li>"#
    )
}

/// A listing page; `has_next` adds a pager whose ninth control points onward
pub fn listing_page(items: &[String], has_next: bool) -> String {
    let pager = if has_next {
        (1..=9)
            .map(|n| format!(r#"<a class="flex" href="?page={n}">{n}</a>"#))
            .collect::<String>()
    } else {
        String::new()
    };
    format!(
        r#"<html><body><ul id="results">{}</ul><nav>{}</nav></body></html>"#,
        items.concat(),
        pager
    )
}

/// A program page showing `fee`
pub fn program_page(fee: &str) -> String {
    format!(r#"<html><body><div class="max-w-40">{fee}</div></body></html>"#)
}

/// Program page URL for an item created with [`item`] under `base`
pub fn program_url(base: &str, slug: &str) -> String {
    format!("{}/programs/{}", base, slug)
}

/// Builds an orchestrator over a fresh in-memory store and the given site
pub fn orchestrator(config: Config, site: &FixtureSite) -> (Orchestrator, SharedStorage) {
    let storage = share(SqliteStorage::new_in_memory().unwrap());
    let factory = Arc::new(FixtureFactory::new(site.clone()));
    let orchestrator =
        Orchestrator::new(config, storage.clone(), factory).with_config_hash("test_hash");
    (orchestrator, storage)
}

/// Every persisted program in insertion order
pub fn stored(storage: &SharedStorage) -> Vec<ProgramRecord> {
    storage::lock(storage).list_programs().unwrap()
}
