use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Edu-Sweep
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub renderer: RendererConfig,
    #[serde(default)]
    pub selectors: SelectorConfig,
    pub output: OutputConfig,
    #[serde(default, rename = "category")]
    pub categories: Vec<CategoryEntry>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of categories scraped in parallel, each with its own rendering session
    #[serde(rename = "max-concurrent-sessions", default = "default_max_sessions")]
    pub max_concurrent_sessions: u32,

    /// Upper bound for every element wait (seconds)
    #[serde(rename = "wait-timeout-secs", default = "default_wait_timeout")]
    pub wait_timeout_secs: u64,

    /// Global deadline for a whole scrape cycle (seconds)
    #[serde(rename = "run-deadline-secs", default = "default_run_deadline")]
    pub run_deadline_secs: u64,

    /// Stale-reference retries allowed per listing page
    #[serde(rename = "page-retries", default = "default_page_retries")]
    pub page_retries: u32,

    /// Time granted to cancelled workers to close their sessions (seconds)
    #[serde(rename = "shutdown-grace-secs", default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,
}

impl CrawlerConfig {
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_timeout_secs)
    }

    pub fn run_deadline(&self) -> Duration {
        Duration::from_secs(self.run_deadline_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_sessions: default_max_sessions(),
            wait_timeout_secs: default_wait_timeout(),
            run_deadline_secs: default_run_deadline(),
            page_retries: default_page_retries(),
            shutdown_grace_secs: default_shutdown_grace(),
        }
    }
}

/// HTTP renderer configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RendererConfig {
    /// User agent sent with every page request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Timeout for a single HTTP request (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Structural locators for the portal's markup
///
/// Every selector is plain CSS. The defaults track the portal's current layout so a
/// config file only needs this section when the markup changes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// One node per program on a listing page
    #[serde(rename = "listing-item")]
    pub listing_item: String,

    /// The item's primary link; its `href` is the program page
    #[serde(rename = "program-link")]
    pub program_link: String,

    pub university: String,

    pub title: String,

    /// Block holding the location list
    #[serde(rename = "location-block")]
    pub location_block: String,

    /// Entry inside the location block
    #[serde(rename = "location-entry")]
    pub location_entry: String,

    /// Block holding the labelled info entries
    #[serde(rename = "details-block")]
    pub details_block: String,

    #[serde(rename = "info-entry")]
    pub info_entry: String,

    /// Node inside an info entry carrying the `aria-label` classifier
    #[serde(rename = "info-label")]
    pub info_label: String,

    /// Node inside an info entry carrying the value text
    #[serde(rename = "info-value")]
    pub info_value: String,

    /// Tuition fee on the program page
    #[serde(rename = "tuition-fee")]
    pub tuition_fee: String,

    /// Pagination control pointing at the following page
    #[serde(rename = "next-page")]
    pub next_page: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            listing_item: "#results > li".to_string(),
            program_link: "a.block.cursor-pointer".to_string(),
            university: r"p.sm.mb-2.md\:mr-16".to_string(),
            title: "h3".to_string(),
            location_block: ".location".to_string(),
            location_entry: "li".to_string(),
            details_block: ".program-info".to_string(),
            info_entry: ".info".to_string(),
            info_label: "div".to_string(),
            info_value: "p".to_string(),
            tuition_fee: ".max-w-40".to_string(),
            next_page: "a.flex:nth-child(9)".to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Path to the markdown summary file
    #[serde(rename = "summary-path")]
    pub summary_path: String,
}

/// A listing category scraped by its own worker
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryEntry {
    /// Short name stored with every record (e.g., "bachelors")
    pub name: String,

    /// First listing page of the category, without a `page` parameter
    pub url: String,
}

fn default_max_sessions() -> u32 {
    4
}

fn default_wait_timeout() -> u64 {
    20
}

fn default_run_deadline() -> u64 {
    3600
}

fn default_page_retries() -> u32 {
    3
}

fn default_shutdown_grace() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("edu-sweep/{}", env!("CARGO_PKG_VERSION"))
}

fn default_request_timeout() -> u64 {
    30
}
