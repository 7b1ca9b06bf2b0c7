use crate::config::validation::MAX_WORKERS;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::PathBuf;
use url::Url;

/// Default output directory when none is configured
pub const DEFAULT_OUTPUT_DIRECTORY: &str = "_site_mirror_output";

/// Main configuration structure for Site-Mirror
///
/// Every section is optional in the TOML file; missing keys fall back to the
/// defaults below and CLI flags are layered on top afterwards.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub extensions: ExtensionConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

/// The site being mirrored
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SiteConfig {
    /// Absolute URL of the starting page
    #[serde(rename = "base-url")]
    pub base_url: Option<String>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of fetches launched per round
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Requeue URLs whose fetch timed out
    #[serde(rename = "retry-on-timeout", default)]
    pub retry_on_timeout: bool,

    /// Ceiling on timeout requeues per URL (0 = unbounded)
    #[serde(rename = "max-timeout-retries", default = "default_max_timeout_retries")]
    pub max_timeout_retries: u32,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            retry_on_timeout: false,
            max_timeout_retries: default_max_timeout_retries(),
        }
    }
}

/// File extensions driving the follow/fetch policy
#[derive(Debug, Clone, Deserialize)]
pub struct ExtensionConfig {
    /// Extensions treated as HTML pages
    #[serde(default = "default_page_extensions")]
    pub page: Vec<String>,

    /// Extensions treated as stylesheets
    #[serde(default = "default_stylesheet_extensions")]
    pub stylesheet: Vec<String>,
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            page: default_page_extensions(),
            stylesheet: default_stylesheet_extensions(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Root directory the mirror is written under
    #[serde(default = "default_output_directory")]
    pub directory: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
        }
    }
}

/// HTTP client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Whole-request timeout in seconds
    #[serde(rename = "request-timeout", default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Connection timeout in seconds
    #[serde(rename = "connect-timeout", default = "default_connect_timeout")]
    pub connect_timeout: u64,

    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout: default_request_timeout(),
            connect_timeout: default_connect_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Validated, immutable settings for a single run
///
/// Built once by [`CrawlSettings::from_config`] and shared read-only with
/// every worker.
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    /// Starting URL exactly as configured
    pub base_url: Url,

    /// Lowercase host every followed link must share
    pub base_host: String,

    pub output_root: PathBuf,

    /// Always at least 1
    pub workers: usize,

    /// Lowercase, without leading dots
    pub page_extensions: HashSet<String>,

    /// Lowercase, without leading dots
    pub stylesheet_extensions: HashSet<String>,

    pub retry_on_timeout: bool,

    /// `None` means timeouts are requeued without limit
    pub max_timeout_retries: Option<u32>,

    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub user_agent: String,
}

fn default_workers() -> usize {
    workers_for_processors(
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1),
    )
}

/// One worker per logical processor, kept within the accepted range
fn workers_for_processors(processors: usize) -> usize {
    processors.clamp(1, MAX_WORKERS)
}

fn default_max_timeout_retries() -> u32 {
    5
}

fn default_page_extensions() -> Vec<String> {
    vec!["html".to_string(), "htm".to_string()]
}

fn default_stylesheet_extensions() -> Vec<String> {
    vec!["css".to_string()]
}

fn default_output_directory() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIRECTORY)
}

fn default_request_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_user_agent() -> String {
    format!("SiteMirror/{}", env!("CARGO_PKG_VERSION"))
}
