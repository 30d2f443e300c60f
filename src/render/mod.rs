//! Rendering engine capability
//!
//! The crawler never talks to a page directly. It drives a [`RenderingEngine`] session:
//! navigate, wait for elements, read text and attributes, refresh, close. [`HttpRenderer`]
//! fetches pages over HTTP and serves queries from the loaded markup. With the `test-util`
//! feature, `FixtureRenderer` adds a deterministic in-memory site with scriptable faults.
//!
//! Sessions are created through an [`EngineFactory`], one per category worker.

mod document;
#[cfg(any(test, feature = "test-util"))]
mod fixture;
mod http;

pub use document::{parse_selector, Document};
#[cfg(any(test, feature = "test-util"))]
pub use fixture::{Fault, FixtureFactory, FixtureRenderer, FixtureSite};
pub use http::{build_http_client, HttpRenderer, HttpRendererFactory};

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by a rendering session
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
    /// The page changed between locating a node and reading it
    #[error("Stale element reference: {0}")]
    StaleReference(String),

    #[error("Timed out after {waited:?} waiting for '{selector}'")]
    Timeout { selector: String, waited: Duration },

    #[error("No element matches '{selector}'")]
    NotFound { selector: String },

    /// Session-fatal failure (crashed session, network failure, unusable page)
    #[error("Driver error: {0}")]
    Driver(String),
}

impl RenderError {
    /// Returns true for errors worth retrying after a refresh
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::StaleReference(_))
    }

    /// Returns true for errors that leave the session unusable
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Driver(_))
    }
}

/// Reference to an element of the page a session has loaded
///
/// Handles are only valid for the page load that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle {
    pub(crate) generation: u64,
    pub(crate) ordinal: usize,
}

/// One exclusive page-rendering session
#[async_trait]
pub trait RenderingEngine: Send + Sync {
    /// Loads `url`, replacing the current page
    async fn navigate(&mut self, url: &str) -> Result<(), RenderError>;

    /// Waits until at least one node matches `selector`, up to `timeout`
    async fn wait_for_selector(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<Vec<NodeHandle>, RenderError>;

    /// First descendant of `node` matching `selector`
    async fn find_child(&self, node: &NodeHandle, selector: &str)
        -> Result<NodeHandle, RenderError>;

    /// All descendants of `node` matching `selector`; empty when none match
    async fn find_children(
        &self,
        node: &NodeHandle,
        selector: &str,
    ) -> Result<Vec<NodeHandle>, RenderError>;

    async fn text(&self, node: &NodeHandle) -> Result<String, RenderError>;

    async fn attribute(&self, node: &NodeHandle, name: &str)
        -> Result<Option<String>, RenderError>;

    /// Reloads the current page; every previously issued handle becomes stale
    async fn refresh(&mut self) -> Result<(), RenderError>;

    /// Releases the session. Further calls fail with a driver error.
    async fn close(&mut self) -> Result<(), RenderError>;
}

/// Opens rendering sessions for category workers
#[async_trait]
pub trait EngineFactory: Send + Sync {
    async fn open_session(&self) -> Result<Box<dyn RenderingEngine>, RenderError>;
}
