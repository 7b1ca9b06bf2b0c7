use crate::config::types::{Config, CrawlSettings, CrawlerConfig, ExtensionConfig};
use crate::url::extract_domain;
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Upper bound on concurrent fetches per round
pub const MAX_WORKERS: usize = 64;

impl CrawlSettings {
    /// Validates a configuration and freezes it into run settings
    ///
    /// # Errors
    ///
    /// * `ConfigError::InvalidUrl` - base URL missing, relative, non-http(s) or hostless
    /// * `ConfigError::Validation` - worker count, extensions or output directory invalid
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let base_url = validate_base_url(config.site.base_url.as_deref())?;
        let base_host = extract_domain(&base_url).ok_or_else(|| {
            ConfigError::InvalidUrl(format!("Base URL '{}' has no host", base_url))
        })?;

        validate_crawler_config(&config.crawler)?;
        validate_extensions(&config.extensions)?;

        if config.output.directory.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "output directory cannot be empty".to_string(),
            ));
        }

        if config.http.request_timeout == 0 || config.http.connect_timeout == 0 {
            return Err(ConfigError::Validation(
                "HTTP timeouts must be at least 1 second".to_string(),
            ));
        }

        let max_timeout_retries = match config.crawler.max_timeout_retries {
            0 => None,
            n => Some(n),
        };

        Ok(Self {
            base_url,
            base_host,
            output_root: config.output.directory.clone(),
            workers: config.crawler.workers,
            page_extensions: normalize_extensions(&config.extensions.page),
            stylesheet_extensions: normalize_extensions(&config.extensions.stylesheet),
            retry_on_timeout: config.crawler.retry_on_timeout,
            max_timeout_retries,
            request_timeout_secs: config.http.request_timeout,
            connect_timeout_secs: config.http.connect_timeout,
            user_agent: config.http.user_agent.clone(),
        })
    }

    /// Returns true if the extension (without dot, any case) is page-like
    pub fn is_page_extension(&self, extension: &str) -> bool {
        self.page_extensions.contains(&extension.to_ascii_lowercase())
    }

    /// Returns true if the extension (without dot, any case) is stylesheet-like
    pub fn is_stylesheet_extension(&self, extension: &str) -> bool {
        self.stylesheet_extensions
            .contains(&extension.to_ascii_lowercase())
    }
}

fn validate_base_url(raw: Option<&str>) -> Result<Url, ConfigError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ConfigError::InvalidUrl("base URL is required".to_string()))?;

    let url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base URL '{}': {}", raw, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "Base URL '{}' must use http or https",
            raw
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(ConfigError::InvalidUrl(format!(
            "Base URL '{}' has no host",
            raw
        )));
    }

    Ok(url)
}

fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > MAX_WORKERS {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and {}, got {}",
            MAX_WORKERS, config.workers
        )));
    }

    Ok(())
}

fn validate_extensions(config: &ExtensionConfig) -> Result<(), ConfigError> {
    if normalize_extensions(&config.page).is_empty() {
        return Err(ConfigError::Validation(
            "at least one page extension is required".to_string(),
        ));
    }

    for ext in config.page.iter().chain(&config.stylesheet) {
        let trimmed = ext.trim().trim_start_matches('.');
        if !trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ConfigError::Validation(format!(
                "extension '{}' contains invalid characters",
                ext
            )));
        }
    }

    Ok(())
}

/// Lowercases, strips leading dots and drops empty entries
fn normalize_extensions(extensions: &[String]) -> HashSet<String> {
    extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}
