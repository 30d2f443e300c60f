//! In-memory rendering engine
//!
//! [`FixtureSite`] holds a fixed set of pages keyed by URL plus a list of scripted
//! [`Fault`]s. [`FixtureRenderer`] sessions browse that site deterministically, which makes
//! the crawl's retry and termination behavior reproducible without a network. Unknown URLs
//! render as an empty page, the way a portal answers past its last listing page.

use crate::render::{Document, EngineFactory, NodeHandle, RenderError, RenderingEngine};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use url::Url;

const EMPTY_PAGE: &str = "<html><head></head><body></body></html>";

/// A scripted failure injected into fixture sessions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// Waiting for `selector` while `url` is loaded raises a stale reference, `times` times
    StaleWait {
        url: String,
        selector: String,
        times: u32,
    },

    /// Reading any node text while `url` is loaded raises a stale reference, `times` times
    StaleText { url: String, times: u32 },

    /// Waiting for `selector` while `url` is loaded times out even if the element exists
    TimeoutWait { url: String, selector: String },

    /// Navigating to `url` raises a stale reference, `times` times
    StaleOnNavigate { url: String, times: u32 },

    /// Navigating to `url` fails with a driver error
    DriverOnNavigate { url: String },

    /// Navigating to `url` takes `delay` before the page is available
    SlowNavigate { url: String, delay: Duration },
}

impl Fault {
    fn normalized(self) -> Self {
        match self {
            Self::StaleWait {
                url,
                selector,
                times,
            } => Self::StaleWait {
                url: normalize(&url),
                selector,
                times,
            },
            Self::StaleText { url, times } => Self::StaleText {
                url: normalize(&url),
                times,
            },
            Self::TimeoutWait { url, selector } => Self::TimeoutWait {
                url: normalize(&url),
                selector,
            },
            Self::StaleOnNavigate { url, times } => Self::StaleOnNavigate {
                url: normalize(&url),
                times,
            },
            Self::DriverOnNavigate { url } => Self::DriverOnNavigate {
                url: normalize(&url),
            },
            Self::SlowNavigate { url, delay } => Self::SlowNavigate {
                url: normalize(&url),
                delay,
            },
        }
    }
}

#[derive(Debug, Default)]
struct SiteState {
    pages: HashMap<String, String>,
    faults: Vec<Fault>,
    navigations: Vec<String>,
    sessions_opened: usize,
    sessions_closed: usize,
    peak_open: usize,
}

/// Shared definition of a fixture site
///
/// Cloning is cheap; all clones and every session opened from them see the same pages,
/// faults and navigation log.
#[derive(Debug, Clone, Default)]
pub struct FixtureSite {
    state: Arc<Mutex<SiteState>>,
}

impl FixtureSite {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the markup served for `url`
    pub fn add_page(&self, url: &str, html: impl Into<String>) {
        self.lock().pages.insert(normalize(url), html.into());
    }

    pub fn with_page(self, url: &str, html: impl Into<String>) -> Self {
        self.add_page(url, html);
        self
    }

    pub fn add_fault(&self, fault: Fault) {
        self.lock().faults.push(fault.normalized());
    }

    pub fn with_fault(self, fault: Fault) -> Self {
        self.add_fault(fault);
        self
    }

    /// Every URL navigated to or refreshed, across all sessions, in call order
    pub fn navigations(&self) -> Vec<String> {
        self.lock().navigations.clone()
    }

    /// Number of navigations and refreshes that hit `url`
    pub fn visits(&self, url: &str) -> usize {
        let url = normalize(url);
        self.lock().navigations.iter().filter(|u| **u == url).count()
    }

    pub fn sessions_opened(&self) -> usize {
        self.lock().sessions_opened
    }

    pub fn sessions_closed(&self) -> usize {
        self.lock().sessions_closed
    }

    /// Highest number of sessions that were open at the same time
    pub fn peak_open_sessions(&self) -> usize {
        self.lock().peak_open
    }

    /// Opens a session directly, outside of a factory
    pub fn open(&self) -> FixtureRenderer {
        {
            let mut state = self.lock();
            state.sessions_opened += 1;
            let open = state.sessions_opened - state.sessions_closed;
            state.peak_open = state.peak_open.max(open);
        }
        FixtureRenderer {
            site: self.clone(),
            document: None,
            loads: 0,
            closed: false,
        }
    }

    fn lock(&self) -> MutexGuard<'_, SiteState> {
        // A panic while holding the lock only happens inside a failing test
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn load(&self, url: &str) -> Result<(String, Option<Duration>), RenderError> {
        let mut state = self.lock();
        state.navigations.push(url.to_string());

        let mut delay = None;
        for fault in state.faults.iter_mut() {
            match fault {
                Fault::StaleOnNavigate { url: target, times } if *times > 0 && target == url => {
                    *times -= 1;
                    return Err(RenderError::StaleReference(format!(
                        "window handle went stale loading {}",
                        url
                    )));
                }
                Fault::DriverOnNavigate { url: target } if target == url => {
                    return Err(RenderError::Driver(format!("session crashed loading {}", url)));
                }
                Fault::SlowNavigate { url: target, delay: d } if target == url => {
                    delay = Some(*d);
                }
                _ => {}
            }
        }

        let body = state
            .pages
            .get(url)
            .cloned()
            .unwrap_or_else(|| EMPTY_PAGE.to_string());
        Ok((body, delay))
    }

    fn wait_fault(&self, url: &str, selector: &str) -> Option<RenderError> {
        let mut state = self.lock();
        for fault in state.faults.iter_mut() {
            match fault {
                Fault::StaleWait {
                    url: target,
                    selector: sel,
                    times,
                } if *times > 0 && target == url && sel == selector => {
                    *times -= 1;
                    return Some(RenderError::StaleReference(format!(
                        "'{}' detached while loading {}",
                        selector, url
                    )));
                }
                Fault::TimeoutWait {
                    url: target,
                    selector: sel,
                } if target == url && sel == selector => {
                    return Some(RenderError::Timeout {
                        selector: selector.to_string(),
                        waited: Duration::ZERO,
                    });
                }
                _ => {}
            }
        }
        None
    }

    fn text_fault(&self, url: &str) -> Option<RenderError> {
        let mut state = self.lock();
        for fault in state.faults.iter_mut() {
            if let Fault::StaleText { url: target, times } = fault {
                if *times > 0 && target == url {
                    *times -= 1;
                    return Some(RenderError::StaleReference(format!(
                        "text node replaced on {}",
                        url
                    )));
                }
            }
        }
        None
    }
}

/// One session browsing a [`FixtureSite`]
pub struct FixtureRenderer {
    site: FixtureSite,
    document: Option<Document>,
    loads: u64,
    closed: bool,
}

impl FixtureRenderer {
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn current(&self) -> Result<&Document, RenderError> {
        if self.closed {
            return Err(RenderError::Driver("session is closed".to_string()));
        }
        self.document
            .as_ref()
            .ok_or_else(|| RenderError::Driver("no page loaded".to_string()))
    }

    fn current_url(&self) -> Result<String, RenderError> {
        Ok(self.current()?.url().to_string())
    }

    async fn load(&mut self, url: String) -> Result<(), RenderError> {
        if self.closed {
            return Err(RenderError::Driver("session is closed".to_string()));
        }

        let parsed = Url::parse(&url)
            .map_err(|e| RenderError::Driver(format!("invalid URL '{}': {}", url, e)))?;
        let (body, delay) = self.site.load(parsed.as_str())?;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.loads += 1;
        self.document = Some(Document::new(parsed, body, self.loads));
        Ok(())
    }
}

#[async_trait]
impl RenderingEngine for FixtureRenderer {
    async fn navigate(&mut self, url: &str) -> Result<(), RenderError> {
        self.load(url.to_string()).await
    }

    async fn wait_for_selector(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<Vec<NodeHandle>, RenderError> {
        let url = self.current_url()?;
        if let Some(err) = self.site.wait_fault(&url, selector) {
            return Err(err);
        }

        let nodes = self.current()?.select_all(selector)?;
        if nodes.is_empty() {
            return Err(RenderError::Timeout {
                selector: selector.to_string(),
                waited: timeout,
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
        let url = self.current_url()?;
        if let Some(err) = self.site.text_fault(&url) {
            return Err(err);
        }
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
        let url = self.current_url()?;
        self.load(url).await
    }

    async fn close(&mut self) -> Result<(), RenderError> {
        if !self.closed {
            self.closed = true;
            self.document = None;
            self.site.lock().sessions_closed += 1;
        }
        Ok(())
    }
}

/// Opens [`FixtureRenderer`] sessions on a shared site
#[derive(Debug, Clone)]
pub struct FixtureFactory {
    site: FixtureSite,
}

impl FixtureFactory {
    pub fn new(site: FixtureSite) -> Self {
        Self { site }
    }

    pub fn site(&self) -> &FixtureSite {
        &self.site
    }
}

#[async_trait]
impl EngineFactory for FixtureFactory {
    async fn open_session(&self) -> Result<Box<dyn RenderingEngine>, RenderError> {
        Ok(Box::new(self.site.open()))
    }
}

fn normalize(url: &str) -> String {
    Url::parse(url)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| url.to_string())
}
