use crate::config::types::{Config, ExtractionConfig, FetcherConfig, OriginConfig, SyncConfig};
use crate::ConfigError;
use regex::Regex;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_origin_config(&config.origin)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_sync_config(&config.sync)?;
    validate_extraction_config(&config.extraction)?;

    if config.output.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates origin layout settings
fn validate_origin_config(config: &OriginConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.root_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid root_url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "root_url must use http or https, got '{}'",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(
            "root_url must contain a host".to_string(),
        ));
    }

    Regex::new(&config.category_pattern).map_err(|e| {
        ConfigError::InvalidPattern(format!(
            "category_pattern '{}' is not a valid regex: {}",
            config.category_pattern, e
        ))
    })?;

    if !config.page_path_template.contains("{n}") {
        return Err(ConfigError::Validation(format!(
            "page_path_template must contain '{{n}}', got '{}'",
            config.page_path_template
        )));
    }

    if config.max_pages_per_source < 1 || config.max_pages_per_source > 100 {
        return Err(ConfigError::Validation(format!(
            "max_pages_per_source must be between 1 and 100, got {}",
            config.max_pages_per_source
        )));
    }

    validate_selector(&config.entry_link_selector)?;

    Ok(())
}

/// Validates fetcher settings
fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    if config.max_attempts < 1 || config.max_attempts > 10 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be between 1 and 10, got {}",
            config.max_attempts
        )));
    }

    Ok(())
}

/// Validates batch settings
fn validate_sync_config(config: &SyncConfig) -> Result<(), ConfigError> {
    if config.batch_size < 1 || config.batch_size > 100 {
        return Err(ConfigError::Validation(format!(
            "batch_size must be between 1 and 100, got {}",
            config.batch_size
        )));
    }

    if config.concurrency < 1 || config.concurrency > 16 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 16, got {}",
            config.concurrency
        )));
    }

    if config.recent_titles < 1 {
        return Err(ConfigError::Validation(
            "recent_titles must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates extraction settings
fn validate_extraction_config(config: &ExtractionConfig) -> Result<(), ConfigError> {
    for selector in &config.container_selectors {
        validate_selector(selector)?;
    }
    Ok(())
}

fn validate_selector(selector: &str) -> Result<(), ConfigError> {
    Selector::parse(selector).map_err(|e| {
        ConfigError::InvalidPattern(format!("Invalid CSS selector '{}': {:?}", selector, e))
    })?;
    Ok(())
}
