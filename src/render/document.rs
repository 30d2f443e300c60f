//! Loaded page snapshots and node resolution
//!
//! A [`Document`] keeps the raw markup of the page a session currently shows together with
//! a generation counter. Node handles carry the generation they were issued under; once the
//! session navigates or refreshes, the generation moves on and older handles resolve to
//! [`RenderError::StaleReference`], the same way a live browser invalidates element
//! references when the page changes underneath them.
//!
//! The markup is re-parsed per query so that no parsed tree is held across an await point.

use crate::render::{NodeHandle, RenderError};
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Markup of the currently loaded page
#[derive(Debug, Clone)]
pub struct Document {
    url: Url,
    body: String,
    generation: u64,
}

impl Document {
    pub fn new(url: Url, body: String, generation: u64) -> Self {
        Self {
            url,
            body,
            generation,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// All nodes matching `selector`, in document order
    pub fn select_all(&self, selector: &str) -> Result<Vec<NodeHandle>, RenderError> {
        let selector = parse_selector(selector)?;
        let html = Html::parse_document(&self.body);
        let elements = elements(&html);

        Ok(html
            .select(&selector)
            .filter_map(|matched| ordinal_of(&elements, matched))
            .map(|ordinal| self.handle(ordinal))
            .collect())
    }

    /// First descendant of `node` matching `selector`
    pub fn find_child(&self, node: &NodeHandle, selector: &str) -> Result<NodeHandle, RenderError> {
        self.find_children(node, selector)?
            .into_iter()
            .next()
            .ok_or_else(|| RenderError::NotFound {
                selector: selector.to_string(),
            })
    }

    /// All descendants of `node` matching `selector`, in document order
    pub fn find_children(
        &self,
        node: &NodeHandle,
        selector: &str,
    ) -> Result<Vec<NodeHandle>, RenderError> {
        self.check_generation(node)?;
        let parsed = parse_selector(selector)?;
        let html = Html::parse_document(&self.body);
        let elements = elements(&html);
        let parent = resolve(&elements, node)?;

        Ok(parent
            .select(&parsed)
            .filter(|matched| matched.id() != parent.id())
            .filter_map(|matched| ordinal_of(&elements, matched))
            .map(|ordinal| self.handle(ordinal))
            .collect())
    }

    /// Visible text of a node with whitespace collapsed
    pub fn text(&self, node: &NodeHandle) -> Result<String, RenderError> {
        self.check_generation(node)?;
        let html = Html::parse_document(&self.body);
        let elements = elements(&html);
        let element = resolve(&elements, node)?;

        Ok(element
            .text()
            .flat_map(str::split_whitespace)
            .collect::<Vec<_>>()
            .join(" "))
    }

    /// Attribute value of a node
    ///
    /// `href` and `src` are resolved against the page URL like a browser's property
    /// accessors do.
    pub fn attribute(&self, node: &NodeHandle, name: &str) -> Result<Option<String>, RenderError> {
        self.check_generation(node)?;
        let html = Html::parse_document(&self.body);
        let elements = elements(&html);
        let element = resolve(&elements, node)?;

        let value = match element.value().attr(name) {
            Some(v) => v,
            None => return Ok(None),
        };

        if name == "href" || name == "src" {
            if let Ok(absolute) = self.url.join(value.trim()) {
                return Ok(Some(absolute.to_string()));
            }
        }

        Ok(Some(value.to_string()))
    }

    fn handle(&self, ordinal: usize) -> NodeHandle {
        NodeHandle {
            generation: self.generation,
            ordinal,
        }
    }

    fn check_generation(&self, node: &NodeHandle) -> Result<(), RenderError> {
        if node.generation != self.generation {
            return Err(RenderError::StaleReference(format!(
                "node {} belongs to page load {}, current load is {}",
                node.ordinal, node.generation, self.generation
            )));
        }
        Ok(())
    }
}

/// Parses a CSS selector, mapping syntax errors to a driver error
pub fn parse_selector(selector: &str) -> Result<Selector, RenderError> {
    Selector::parse(selector)
        .map_err(|e| RenderError::Driver(format!("invalid selector '{}': {:?}", selector, e)))
}

/// Every element of the document in document order
fn elements(html: &Html) -> Vec<ElementRef<'_>> {
    html.root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .collect()
}

fn ordinal_of(elements: &[ElementRef<'_>], target: ElementRef<'_>) -> Option<usize> {
    elements.iter().position(|e| e.id() == target.id())
}

fn resolve<'a>(
    elements: &[ElementRef<'a>],
    node: &NodeHandle,
) -> Result<ElementRef<'a>, RenderError> {
    elements.get(node.ordinal).copied().ok_or_else(|| {
        RenderError::StaleReference(format!("node {} no longer exists", node.ordinal))
    })
}
