use crate::config::types::{Config, CrawlerConfig, FetchConfig, StoreConfig};
use crate::ConfigError;

/// Upper bound on in-flight domains; each one holds two open navigations
const MAX_CONCURRENCY: usize = 512;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_fetch_config(&config.fetch)?;
    validate_store_config(&config.store)?;
    Ok(())
}

fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.concurrency < 1 || config.concurrency > MAX_CONCURRENCY {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and {}, got {}",
            MAX_CONCURRENCY, config.concurrency
        )));
    }

    if config.batch_size < 1 {
        return Err(ConfigError::Validation(format!(
            "batch-size must be >= 1, got {}",
            config.batch_size
        )));
    }

    if config.domain_list.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "domain-list cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.navigation_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "navigation-timeout-ms must be >= 100ms, got {}ms",
            config.navigation_timeout_ms
        )));
    }

    if config.settle_delay_ms >= config.navigation_timeout_ms {
        return Err(ConfigError::Validation(format!(
            "settle-delay-ms ({}) must be shorter than navigation-timeout-ms ({})",
            config.settle_delay_ms, config.navigation_timeout_ms
        )));
    }

    if config.max_redirects < 1 || config.max_redirects > 100 {
        return Err(ConfigError::Validation(format!(
            "max-redirects must be between 1 and 100, got {}",
            config.max_redirects
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_store_config(config: &StoreConfig) -> Result<(), ConfigError> {
    if config.name.is_empty() {
        return Err(ConfigError::Validation(
            "store name cannot be empty".to_string(),
        ));
    }

    if config.name.ends_with('/') {
        return Err(ConfigError::Validation(format!(
            "store name '{}' must name a file, not a directory",
            config.name
        )));
    }

    Ok(())
}
