//! Site-Mirror main entry point
//!
//! This is the command-line interface for the Site-Mirror website mirroring crawler.

use anyhow::{bail, Context};
use clap::Parser;
use site_mirror::config::{load_config_with_hash, Config, CrawlSettings};
use site_mirror::output::print_summary;
use site_mirror::{Coordinator, DiskStore, TracingLogger};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Site-Mirror: mirror a single website to local disk
///
/// Site-Mirror fetches the starting page, follows same-domain links
/// breadth-first in bounded-parallel rounds, and writes every resource under
/// an output directory that mirrors the site's URL paths.
#[derive(Parser, Debug)]
#[command(name = "site-mirror")]
#[command(version = "1.0.0")]
#[command(about = "Mirror a single website to local disk", long_about = None)]
struct Cli {
    /// Absolute URL to start from (overrides `site.base-url`)
    #[arg(value_name = "BASE_URL")]
    base_url: Option<String>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory the mirror is written to (removed and recreated)
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Number of parallel fetches per round
    #[arg(short, long)]
    workers: Option<usize>,

    /// Page-like extensions, comma separated (e.g. html,htm,php)
    #[arg(long, value_delimiter = ',')]
    page_ext: Option<Vec<String>>,

    /// Stylesheet extensions, comma separated
    #[arg(long, value_delimiter = ',')]
    css_ext: Option<Vec<String>>,

    /// Requeue resources whose fetch timed out
    #[arg(long)]
    retry_on_timeout: bool,

    /// Maximum timeout requeues per resource (0 = unbounded)
    #[arg(long, value_name = "N")]
    max_timeout_retries: Option<u32>,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    yes: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    apply_overrides(&mut config, &cli);

    if config.site.base_url.is_none() {
        bail!("A base URL is required, either as an argument or as site.base-url in the config file");
    }

    let settings = CrawlSettings::from_config(&config).context("Invalid configuration")?;

    if !cli.yes && !confirm(&settings)? {
        println!("\nOperation cancelled by user.");
        return Ok(());
    }

    prepare_output_dir(&settings.output_root)?;

    let coordinator = Coordinator::new(
        settings,
        Arc::new(TracingLogger::new()),
        Arc::new(DiskStore::new()),
    )?;
    let summary = coordinator.run().await?;

    println!();
    print_summary(&summary);

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("site_mirror=info,warn"),
            1 => EnvFilter::new("site_mirror=debug,info"),
            2 => EnvFilter::new("site_mirror=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Layers CLI flags over the file (or default) configuration
fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(base_url) = &cli.base_url {
        config.site.base_url = Some(base_url.clone());
    }
    if let Some(dir) = &cli.output_dir {
        config.output.directory = dir.clone();
    }
    if let Some(workers) = cli.workers {
        config.crawler.workers = workers;
    }
    if let Some(page_ext) = &cli.page_ext {
        config.extensions.page = page_ext.clone();
    }
    if let Some(css_ext) = &cli.css_ext {
        config.extensions.stylesheet = css_ext.clone();
    }
    if cli.retry_on_timeout {
        config.crawler.retry_on_timeout = true;
    }
    if let Some(max) = cli.max_timeout_retries {
        config.crawler.max_timeout_retries = max;
    }
}

/// Shows the run parameters and asks for a Y/N answer
fn confirm(settings: &CrawlSettings) -> anyhow::Result<bool> {
    let mut page_ext: Vec<_> = settings.page_extensions.iter().cloned().collect();
    page_ext.sort();
    let mut css_ext: Vec<_> = settings.stylesheet_extensions.iter().cloned().collect();
    css_ext.sort();

    println!("=== Site-Mirror ===\n");
    println!("The following parameters will be used:");
    println!("  Base URL:          {}", settings.base_url);
    println!("  Output directory:  {}", settings.output_root.display());
    println!("  Workers:           {}", settings.workers);
    println!("  Page extensions:   {}", page_ext.join(","));
    println!("  CSS extensions:    {}", css_ext.join(","));
    println!(
        "  Retry on timeout:  {}",
        match (settings.retry_on_timeout, settings.max_timeout_retries) {
            (false, _) => "no".to_string(),
            (true, Some(max)) => format!("yes (up to {} times)", max),
            (true, None) => "yes (unbounded)".to_string(),
        }
    );
    println!("\nAny existing output in the directory will be removed.");
    print!("Are you sure you want to continue? [Y/N]: ");
    io::stdout().flush().context("Failed to write prompt")?;

    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("Failed to read answer")?;

    Ok(answer.trim().eq_ignore_ascii_case("y"))
}

/// Removes any previous output and recreates the directory
fn prepare_output_dir(dir: &Path) -> anyhow::Result<()> {
    if dir.exists() {
        tracing::info!("Removing previous output in {}", dir.display());
        std::fs::remove_dir_all(dir)
            .with_context(|| format!("Failed to remove {}", dir.display()))?;
    }

    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    Ok(())
}
