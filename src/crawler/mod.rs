//! Crawler module for mirroring a site
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with error classification
//! - HTML link and stylesheet reference extraction
//! - Bounded-parallel round scheduling
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod parser;
mod scheduler;
mod worker;

pub use coordinator::{run_mirror, Coordinator};
pub use fetcher::{build_http_client, fetch_url, FetchResult, MAX_REDIRECTS};
pub use parser::{extract_css_references, extract_links, CssReference, ExtractedLinks};
pub use scheduler::{CrawlPhase, Scheduler};

use crate::config::{Config, CrawlSettings};
use crate::output::RunSummary;
use crate::MirrorError;

/// Runs a complete mirroring operation
///
/// This is the main entry point for starting a run. It will:
/// 1. Validate the configuration
/// 2. Build the HTTP client
/// 3. Verify the output root is writable
/// 4. Crawl pages, then auxiliary resources, until nothing is pending
/// 5. Report the summary
///
/// # Arguments
///
/// * `config` - The mirror configuration
///
/// # Returns
///
/// * `Ok(RunSummary)` - Run completed; per-resource failures are in the summary
/// * `Err(MirrorError)` - Invalid configuration or unusable output root
pub async fn mirror_site(config: &Config) -> Result<RunSummary, MirrorError> {
    let settings = CrawlSettings::from_config(config)?;
    run_mirror(settings).await
}
