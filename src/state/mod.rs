//! State module for tracking category crawl progress
//!
//! # Components
//!
//! - `CrawlTask`: the per-category cursor (page number and remaining retry budget)
//! - `WorkerState`: the category worker's state machine and its transition function
//! - `WorkerOutcome`: how a category finished, as reported and persisted

mod crawl_task;
mod worker_state;

// Re-export main types
pub use crawl_task::CrawlTask;
pub use worker_state::{transition, StepEvent, WorkerOutcome, WorkerState};
