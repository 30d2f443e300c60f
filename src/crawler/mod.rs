//! Crawler module for category scraping
//!
//! This module contains the core scraping logic, including:
//! - Listing item field extraction
//! - Listing page traversal and next-page probing
//! - Program page visits for the tuition fee
//! - The per-category worker state machine
//! - Bounded fan-out of workers under a run deadline

mod detail;
mod extractor;
mod orchestrator;
mod pagination;
mod worker;

pub use detail::fetch_tuition_fee;
pub use extractor::{extract_item, ExtractError};
pub use orchestrator::{run_scrape_cycle, run_scrape_cycle_with_hash, Orchestrator, RunReport};
pub use pagination::{page_url, PageWalker};
pub use worker::{CategoryReport, CategoryWorker};
