//! Integration tests for Edu-Sweep
//!
//! The scrape cycle is driven end to end against the in-memory fixture site and, for the
//! HTTP renderer, against wiremock servers.

mod common;
mod cycle_tests;
mod failure_tests;
mod http_tests;
