/// Per-category cursor through the listing pages
///
/// A task is an immutable value. Advancing to the next page or spending a retry yields a
/// new task, so the worker's loop never mutates its counters in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTask {
    category_url: String,
    current_page: u32,
    remaining_retries: u32,
    retry_budget: u32,
}

impl CrawlTask {
    /// Starts a task at page 1 with a full retry budget
    pub fn new(category_url: impl Into<String>, retry_budget: u32) -> Self {
        Self {
            category_url: category_url.into(),
            current_page: 1,
            remaining_retries: retry_budget,
            retry_budget,
        }
    }

    pub fn category_url(&self) -> &str {
        &self.category_url
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn remaining_retries(&self) -> u32 {
        self.remaining_retries
    }

    /// Moves to the following page and restores the full retry budget
    pub fn advance(self) -> Self {
        Self {
            current_page: self.current_page + 1,
            remaining_retries: self.retry_budget,
            ..self
        }
    }

    /// Spends one retry on the current page
    pub fn consume_retry(self) -> Self {
        Self {
            remaining_retries: self.remaining_retries.saturating_sub(1),
            ..self
        }
    }

    /// Returns true once no retries are left for the current page
    pub fn retries_exhausted(&self) -> bool {
        self.remaining_retries == 0
    }
}
