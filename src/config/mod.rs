//! Configuration module for Site-Mirror
//!
//! This module handles loading optional TOML configuration files and
//! validating the merged configuration into immutable run settings.
//!
//! # Example
//!
//! ```no_run
//! use site_mirror::config::{load_config, CrawlSettings};
//! use std::path::Path;
//!
//! let config = load_config(Path::new("mirror.toml")).unwrap();
//! let settings = CrawlSettings::from_config(&config).unwrap();
//! println!("Mirroring {} with {} workers", settings.base_url, settings.workers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlSettings, CrawlerConfig, ExtensionConfig, HttpConfig, OutputConfig, SiteConfig,
    DEFAULT_OUTPUT_DIRECTORY,
};
pub use validation::MAX_WORKERS;

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
