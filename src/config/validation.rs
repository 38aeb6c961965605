use crate::config::types::{Config, CrawlerConfig, FetcherConfig, OutputConfig};
use crate::ConfigError;

/// Longest politeness delay accepted (seconds)
const MAX_DELAY_SECONDS: f64 = 3600.0;

/// Longest request timeout accepted (seconds)
const MAX_TIMEOUT_SECONDS: u64 = 120;

/// Most images downloaded per page
const MAX_IMAGES_PER_PAGE: usize = 100;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    validate_delay(config.delay_seconds)?;

    Ok(())
}

/// Validates a politeness delay in seconds
pub(crate) fn validate_delay(delay_seconds: f64) -> Result<(), ConfigError> {
    if !delay_seconds.is_finite() || !(0.0..=MAX_DELAY_SECONDS).contains(&delay_seconds) {
        return Err(ConfigError::Validation(format!(
            "delay_seconds must be between 0 and {}, got {}",
            MAX_DELAY_SECONDS, delay_seconds
        )));
    }

    Ok(())
}

/// Validates fetcher configuration
fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.timeout_seconds < 1 || config.timeout_seconds > MAX_TIMEOUT_SECONDS {
        return Err(ConfigError::Validation(format!(
            "timeout_seconds must be between 1 and {}, got {}",
            MAX_TIMEOUT_SECONDS, config.timeout_seconds
        )));
    }

    if config.max_body_bytes < 1 {
        return Err(ConfigError::Validation(
            "max_body_bytes must be >= 1".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.user_agent.chars().any(|c| c.is_control()) {
        return Err(ConfigError::Validation(
            "user_agent cannot contain control characters".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    let writes_files = config.write_results || config.save_pages || config.download_images;

    if writes_files && config.output_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "output_dir cannot be empty".to_string(),
        ));
    }

    if config.max_images_per_page > MAX_IMAGES_PER_PAGE {
        return Err(ConfigError::Validation(format!(
            "max_images_per_page must be <= {}, got {}",
            MAX_IMAGES_PER_PAGE, config.max_images_per_page
        )));
    }

    Ok(())
}
