//! HTTP-backed rendering engine
//!
//! This engine loads pages with reqwest and answers element queries from the returned
//! markup. It suits portals that render their listings server-side. Because the loaded
//! markup is already complete, a selector that does not match right after a load will not
//! match later either, so element waits resolve immediately instead of polling.

use crate::config::RendererConfig;
use crate::render::{Document, EngineFactory, NodeHandle, RenderError, RenderingEngine};
use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use url::Url;

/// Builds an HTTP client for one rendering session
///
/// Each session gets its own client so connections are never shared between
/// categories.
pub fn build_http_client(config: &RendererConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// A rendering session over plain HTTP
pub struct HttpRenderer {
    client: Client,
    document: Option<Document>,
    loads: u64,
    closed: bool,
}

impl HttpRenderer {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            document: None,
            loads: 0,
            closed: false,
        }
    }

    fn ensure_open(&self) -> Result<(), RenderError> {
        if self.closed {
            return Err(RenderError::Driver("session is closed".to_string()));
        }
        Ok(())
    }

    fn current(&self) -> Result<&Document, RenderError> {
        self.ensure_open()?;
        self.document
            .as_ref()
            .ok_or_else(|| RenderError::Driver("no page loaded".to_string()))
    }

    async fn load(&mut self, url: Url) -> Result<(), RenderError> {
        self.ensure_open()?;

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| RenderError::Driver(format!("request to {} failed: {}", url, e)))?;

        let status = response.status();
        let final_url = response.url().clone();
        if !status.is_success() {
            // A browser still renders error pages; the caller's waits decide what that means
            tracing::debug!("{} answered HTTP {}", url, status.as_u16());
        }

        let body = response
            .text()
            .await
            .map_err(|e| RenderError::Driver(format!("reading body of {} failed: {}", url, e)))?;

        self.loads += 1;
        self.document = Some(Document::new(final_url, body, self.loads));
        Ok(())
    }
}

#[async_trait]
impl RenderingEngine for HttpRenderer {
    async fn navigate(&mut self, url: &str) -> Result<(), RenderError> {
        let url = Url::parse(url)
            .map_err(|e| RenderError::Driver(format!("invalid URL '{}': {}", url, e)))?;
        self.load(url).await
    }

    async fn wait_for_selector(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<Vec<NodeHandle>, RenderError> {
        let started = Instant::now();
        let nodes = self.current()?.select_all(selector)?;

        if nodes.is_empty() {
            return Err(RenderError::Timeout {
                selector: selector.to_string(),
                waited: started.elapsed().min(timeout),
            });
        }

        Ok(nodes)
    }

    async fn find_child(
        &self,
        node: &NodeHandle,
        selector: &str,
    ) -> Result<NodeHandle, RenderError> {
        self.current()?.find_child(node, selector)
    }

    async fn find_children(
        &self,
        node: &NodeHandle,
        selector: &str,
    ) -> Result<Vec<NodeHandle>, RenderError> {
        self.current()?.find_children(node, selector)
    }

    async fn text(&self, node: &NodeHandle) -> Result<String, RenderError> {
        self.current()?.text(node)
    }

    async fn attribute(
        &self,
        node: &NodeHandle,
        name: &str,
    ) -> Result<Option<String>, RenderError> {
        self.current()?.attribute(node, name)
    }

    async fn refresh(&mut self) -> Result<(), RenderError> {
        let url = self.current()?.url().clone();
        self.load(url).await
    }

    async fn close(&mut self) -> Result<(), RenderError> {
        self.closed = true;
        self.document = None;
        Ok(())
    }
}

/// Opens [`HttpRenderer`] sessions
pub struct HttpRendererFactory {
    config: RendererConfig,
}

impl HttpRendererFactory {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl EngineFactory for HttpRendererFactory {
    async fn open_session(&self) -> Result<Box<dyn RenderingEngine>, RenderError> {
        let client = build_http_client(&self.config)
            .map_err(|e| RenderError::Driver(format!("failed to build HTTP client: {}", e)))?;
        Ok(Box::new(HttpRenderer::new(client)))
    }
}
