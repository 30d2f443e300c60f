//! Listing item field extraction
//!
//! Maps one listing item node to an [`ExtractionResult`]. The canonical URL, university,
//! title and location are required; the labelled info entries are best effort.

use crate::config::SelectorConfig;
use crate::program::{ExtractionResult, Field};
use crate::render::{NodeHandle, RenderError, RenderingEngine};
use thiserror::Error;

/// Why a listing item could not be extracted
#[derive(Debug, Error)]
pub enum ExtractError {
    /// A required field is absent; the item is skipped
    #[error("Missing required field '{field}': {source}")]
    MissingField {
        field: Field,
        #[source]
        source: RenderError,
    },

    /// The session failed underneath the extraction; the caller decides whether to retry
    #[error(transparent)]
    Render(RenderError),
}

impl ExtractError {
    fn required(field: Field, err: RenderError) -> Self {
        if err.is_transient() || err.is_fatal() {
            Self::Render(err)
        } else {
            Self::MissingField { field, source: err }
        }
    }
}

/// Extracts the listing fields of one item
///
/// # Arguments
///
/// * `engine` - The session showing the listing page `item` belongs to
/// * `item` - A listing item node
/// * `selectors` - Structural locators for the portal's markup
///
/// # Returns
///
/// * `Ok(ExtractionResult)` - All required fields plus whichever detail fields were present
/// * `Err(ExtractError::MissingField)` - A required field is absent
/// * `Err(ExtractError::Render)` - Stale reference or session failure
pub async fn extract_item(
    engine: &dyn RenderingEngine,
    item: &NodeHandle,
    selectors: &SelectorConfig,
) -> Result<ExtractionResult, ExtractError> {
    let mut result = ExtractionResult::new();

    let link = engine
        .find_child(item, &selectors.program_link)
        .await
        .map_err(|e| ExtractError::required(Field::SourceUrl, e))?;
    let href = engine
        .attribute(&link, "href")
        .await
        .map_err(|e| ExtractError::required(Field::SourceUrl, e))?
        .filter(|href| !href.trim().is_empty())
        .ok_or_else(|| ExtractError::MissingField {
            field: Field::SourceUrl,
            source: RenderError::NotFound {
                selector: format!("{}[href]", selectors.program_link),
            },
        })?;
    result.set(Field::SourceUrl, href);

    let university = required_text(engine, item, &selectors.university, Field::University).await?;
    result.set(Field::University, university);

    let title = required_text(engine, item, &selectors.title, Field::Title).await?;
    result.set(Field::Title, title);

    let block = engine
        .find_child(item, &selectors.location_block)
        .await
        .map_err(|e| ExtractError::required(Field::Location, e))?;
    let location =
        required_text(engine, &block, &selectors.location_entry, Field::Location).await?;
    result.set(Field::Location, location);

    extract_details(engine, item, selectors, &mut result).await?;

    Ok(result)
}

async fn required_text(
    engine: &dyn RenderingEngine,
    parent: &NodeHandle,
    selector: &str,
    field: Field,
) -> Result<String, ExtractError> {
    let node = engine
        .find_child(parent, selector)
        .await
        .map_err(|e| ExtractError::required(field, e))?;
    engine
        .text(&node)
        .await
        .map_err(|e| ExtractError::required(field, e))
}

/// Fills degree, pace, duration, format and languages from the labelled info entries
///
/// A missing block, or an entry without a label or value, contributes nothing.
async fn extract_details(
    engine: &dyn RenderingEngine,
    item: &NodeHandle,
    selectors: &SelectorConfig,
    result: &mut ExtractionResult,
) -> Result<(), ExtractError> {
    let blocks = engine
        .find_children(item, &selectors.details_block)
        .await
        .map_err(ExtractError::Render)?;

    for block in &blocks {
        let entries = engine
            .find_children(block, &selectors.info_entry)
            .await
            .map_err(ExtractError::Render)?;

        for entry in &entries {
            let label = match optional(engine.find_child(entry, &selectors.info_label).await)? {
                Some(node) => node,
                None => continue,
            };
            let classifier = match engine
                .attribute(&label, "aria-label")
                .await
                .map_err(ExtractError::Render)?
            {
                Some(classifier) => classifier,
                None => continue,
            };
            let field = match Field::from_classifier(&classifier) {
                Some(field) => field,
                None => {
                    tracing::trace!("Ignoring info entry '{}'", classifier);
                    continue;
                }
            };

            let value = match optional(engine.find_child(entry, &selectors.info_value).await)? {
                Some(node) => node,
                None => continue,
            };
            let text = engine.text(&value).await.map_err(ExtractError::Render)?;
            result.set(field, text);
        }
    }

    Ok(())
}

fn optional(found: Result<NodeHandle, RenderError>) -> Result<Option<NodeHandle>, ExtractError> {
    match found {
        Ok(node) => Ok(Some(node)),
        Err(RenderError::NotFound { .. }) => Ok(None),
        Err(e) => Err(ExtractError::Render(e)),
    }
}
