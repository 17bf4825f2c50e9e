use crate::config::types::{BrowserConfig, Config, CrawlerConfig, HttpConfig, OutputConfig};
use crate::{ConfigError, ConfigResult};

/// Upper bound on the sitemap recursion depth a config may request
const MAX_SITEMAP_DEPTH_LIMIT: u32 = 10;

/// Validates the entire configuration
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_crawler_config(&config.crawler)?;
    validate_http_config(&config.http)?;
    validate_browser_config(&config.browser)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> ConfigResult<()> {
    if config.max_workers < 1 || config.max_workers > 100 {
        return Err(ConfigError::Validation(format!(
            "max_workers must be between 1 and 100, got {}",
            config.max_workers
        )));
    }

    if config.timeout_seconds < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout_seconds must be >= 1, got {}",
            config.timeout_seconds
        )));
    }

    if config.max_sitemap_depth > MAX_SITEMAP_DEPTH_LIMIT {
        return Err(ConfigError::Validation(format!(
            "max_sitemap_depth must be <= {}, got {}",
            MAX_SITEMAP_DEPTH_LIMIT, config.max_sitemap_depth
        )));
    }

    if !config.dynamic_threshold.is_finite() || config.dynamic_threshold < 0.0 {
        return Err(ConfigError::Validation(format!(
            "dynamic_threshold must be a non-negative number, got {}",
            config.dynamic_threshold
        )));
    }

    if config.idle_poll_ms < 10 {
        return Err(ConfigError::Validation(format!(
            "idle_poll_ms must be >= 10ms, got {}ms",
            config.idle_poll_ms
        )));
    }

    if config.progress_interval < 1 {
        return Err(ConfigError::Validation(
            "progress_interval must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates HTTP client configuration
fn validate_http_config(config: &HttpConfig) -> ConfigResult<()> {
    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    if config.connect_timeout_seconds < 1 {
        return Err(ConfigError::Validation(format!(
            "connect_timeout_seconds must be >= 1, got {}",
            config.connect_timeout_seconds
        )));
    }

    if config.user_agents.is_empty() {
        return Err(ConfigError::Validation(
            "user_agents must contain at least one entry".to_string(),
        ));
    }

    if let Some(agent) = config.user_agents.iter().find(|ua| ua.trim().is_empty()) {
        return Err(ConfigError::Validation(format!(
            "user_agents entries cannot be blank, got '{}'",
            agent
        )));
    }

    Ok(())
}

/// Validates browser configuration
fn validate_browser_config(config: &BrowserConfig) -> ConfigResult<()> {
    if config.render_timeout_seconds < 1 {
        return Err(ConfigError::Validation(format!(
            "render_timeout_seconds must be >= 1, got {}",
            config.render_timeout_seconds
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> ConfigResult<()> {
    if config.base_directory.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "base_directory cannot be empty".to_string(),
        ));
    }

    Ok(())
}
