//! Program page visits for the tuition fee

use crate::program::NOT_AVAILABLE;
use crate::render::{RenderError, RenderingEngine};
use std::time::Duration;

/// Visits a program page and reads its tuition fee
///
/// The fee is best effort: a timeout, a missing or stale element, or empty text all yield
/// [`NOT_AVAILABLE`]. Only failures to load the page at all are returned, because they say
/// something about the session rather than about this program.
///
/// # Arguments
///
/// * `engine` - The category worker's session; it is left on the program page
/// * `source_url` - The program page
/// * `selector` - Locator of the fee element
/// * `wait_timeout` - Upper bound for the element wait
///
/// # Returns
///
/// * `Ok(String)` - The fee text or the sentinel
/// * `Err(RenderError)` - A stale reference or driver failure during navigation
pub async fn fetch_tuition_fee(
    engine: &mut dyn RenderingEngine,
    source_url: &str,
    selector: &str,
    wait_timeout: Duration,
) -> Result<String, RenderError> {
    if let Err(e) = engine.navigate(source_url).await {
        if e.is_transient() || e.is_fatal() {
            return Err(e);
        }
        tracing::debug!("Could not load {}: {}", source_url, e);
        return Ok(NOT_AVAILABLE.to_string());
    }

    let nodes = match engine.wait_for_selector(selector, wait_timeout).await {
        Ok(nodes) => nodes,
        Err(e) => {
            tracing::debug!("No tuition fee on {}: {}", source_url, e);
            return Ok(NOT_AVAILABLE.to_string());
        }
    };

    let fee = match nodes.first() {
        Some(node) => engine.text(node).await,
        None => return Ok(NOT_AVAILABLE.to_string()),
    };

    match fee {
        Ok(text) if !text.is_empty() => Ok(text),
        Ok(_) => Ok(NOT_AVAILABLE.to_string()),
        Err(e) => {
            tracing::debug!("Unreadable tuition fee on {}: {}", source_url, e);
            Ok(NOT_AVAILABLE.to_string())
        }
    }
}
