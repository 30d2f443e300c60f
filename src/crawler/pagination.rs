//! Listing page traversal
//!
//! A category is a sequence of listing pages addressed by a `page` query parameter. The
//! walker loads one page at a time, extracts its items, and probes for a next-page control.

use crate::config::SelectorConfig;
use crate::crawler::extractor::{extract_item, ExtractError};
use crate::program::ExtractionResult;
use crate::render::{NodeHandle, RenderError, RenderingEngine};
use std::time::Duration;
use url::Url;

/// Builds the URL of a listing page
///
/// Any existing `page` parameter is replaced; other query parameters are kept in order.
///
/// # Arguments
///
/// * `category_url` - The category's first listing page
/// * `page` - Page number, starting at 1
pub fn page_url(category_url: &str, page: u32) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(category_url)?;
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "page")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair("page", &page.to_string());

    Ok(url)
}

/// Walks the listing pages of a category with one session
pub struct PageWalker<'a> {
    selectors: &'a SelectorConfig,
    wait_timeout: Duration,
}

impl<'a> PageWalker<'a> {
    pub fn new(selectors: &'a SelectorConfig, wait_timeout: Duration) -> Self {
        Self {
            selectors,
            wait_timeout,
        }
    }

    /// Loads a listing page and extracts its items in document order
    ///
    /// A listing container that never appears means there are no more results and yields an
    /// empty vector. Items with a missing required field are skipped. A stale reference
    /// while extracting triggers one refresh for that item; a second one on the same item,
    /// or one raised while recovering, is returned to the caller.
    pub async fn fetch_page(
        &self,
        engine: &mut dyn RenderingEngine,
        category_url: &str,
        page: u32,
    ) -> Result<Vec<ExtractionResult>, RenderError> {
        let url = listing_url(category_url, page)?;
        engine.navigate(url.as_str()).await?;

        let mut items = match self.wait_for_listing(engine).await? {
            Some(items) => items,
            None => {
                tracing::debug!("No listing on {}", url);
                return Ok(Vec::new());
            }
        };

        let mut results = Vec::with_capacity(items.len());
        let mut recovered_at = None;
        let mut index = 0;

        while index < items.len() {
            match extract_item(&*engine, &items[index], self.selectors).await {
                Ok(result) => results.push(result),
                Err(ExtractError::Render(e)) if e.is_transient() => {
                    if recovered_at == Some(index) {
                        return Err(e);
                    }
                    tracing::warn!(
                        "Stale reference on item {} of {}, refreshing: {}",
                        index + 1,
                        url,
                        e
                    );
                    recovered_at = Some(index);
                    engine.refresh().await?;
                    items = match self.wait_for_listing(engine).await? {
                        Some(items) => items,
                        None => {
                            return Err(RenderError::StaleReference(format!(
                                "listing vanished from {} after refresh",
                                url
                            )))
                        }
                    };
                    continue;
                }
                Err(ExtractError::Render(e)) => return Err(e),
                Err(e) => {
                    tracing::warn!("Skipping item {} of {}: {}", index + 1, url, e);
                }
            }
            index += 1;
        }

        tracing::debug!("Extracted {} of {} items from {}", results.len(), items.len(), url);
        Ok(results)
    }

    /// Returns true if the listing page shows a next-page control
    ///
    /// The session has usually moved on to program pages by now, so the page is loaded
    /// again before probing.
    pub async fn has_next_page(
        &self,
        engine: &mut dyn RenderingEngine,
        category_url: &str,
        page: u32,
    ) -> Result<bool, RenderError> {
        let url = listing_url(category_url, page)?;
        engine.navigate(url.as_str()).await?;

        match engine
            .wait_for_selector(&self.selectors.next_page, self.wait_timeout)
            .await
        {
            Ok(controls) => Ok(!controls.is_empty()),
            Err(RenderError::Timeout { .. }) | Err(RenderError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn wait_for_listing(
        &self,
        engine: &mut dyn RenderingEngine,
    ) -> Result<Option<Vec<NodeHandle>>, RenderError> {
        match engine
            .wait_for_selector(&self.selectors.listing_item, self.wait_timeout)
            .await
        {
            Ok(items) => Ok(Some(items)),
            Err(RenderError::Timeout { .. }) | Err(RenderError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

fn listing_url(category_url: &str, page: u32) -> Result<Url, RenderError> {
    page_url(category_url, page)
        .map_err(|e| RenderError::Driver(format!("invalid category URL '{}': {}", category_url, e)))
}
