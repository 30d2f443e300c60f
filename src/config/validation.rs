use crate::config::types::{CategoryEntry, Config, CrawlerConfig, OutputConfig, SelectorConfig};
use crate::ConfigError;
use scraper::Selector;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_output_config(&config.output)?;
    validate_selectors(&config.selectors)?;
    validate_categories(&config.categories)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_sessions < 1 || config.max_concurrent_sessions > 16 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_sessions must be between 1 and 16, got {}",
            config.max_concurrent_sessions
        )));
    }

    if config.wait_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "wait_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.run_deadline_secs < config.wait_timeout_secs {
        return Err(ConfigError::Validation(format!(
            "run_deadline_secs ({}) must not be shorter than wait_timeout_secs ({})",
            config.run_deadline_secs, config.wait_timeout_secs
        )));
    }

    if config.page_retries < 1 {
        return Err(ConfigError::Validation(format!(
            "page_retries must be >= 1, got {}",
            config.page_retries
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.summary_path.is_empty() {
        return Err(ConfigError::Validation(
            "summary_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Checks that every locator is parseable CSS
fn validate_selectors(selectors: &SelectorConfig) -> Result<(), ConfigError> {
    for selector in [
        &selectors.listing_item,
        &selectors.program_link,
        &selectors.university,
        &selectors.title,
        &selectors.location_block,
        &selectors.location_entry,
        &selectors.details_block,
        &selectors.info_entry,
        &selectors.info_label,
        &selectors.info_value,
        &selectors.tuition_fee,
        &selectors.next_page,
    ] {
        if let Err(e) = Selector::parse(selector) {
            return Err(ConfigError::InvalidSelector {
                selector: selector.clone(),
                message: format!("{:?}", e),
            });
        }
    }

    Ok(())
}

/// Validates category entries
fn validate_categories(categories: &[CategoryEntry]) -> Result<(), ConfigError> {
    if categories.is_empty() {
        return Err(ConfigError::Validation(
            "at least one [[category]] must be configured".to_string(),
        ));
    }

    let mut names = HashSet::new();
    for entry in categories {
        if entry.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "category name cannot be empty".to_string(),
            ));
        }

        if !names.insert(entry.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate category name '{}'",
                entry.name
            )));
        }

        let url = Url::parse(&entry.url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid category URL '{}': {}", entry.url, e))
        })?;

        if url.scheme() != "https" && url.scheme() != "http" {
            return Err(ConfigError::Validation(format!(
                "Category URL '{}' must use HTTP or HTTPS",
                entry.url
            )));
        }
    }

    Ok(())
}
