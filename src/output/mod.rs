//! Output module for end-of-run reporting
//!
//! This module handles:
//! - Accumulating run statistics from all workers
//! - Building the end-of-run summary
//! - Replaying warnings and errors through the logger or to stdout

pub mod stats;

pub use stats::RunStatistics;

use crate::logging::CrawlLogger;
use std::time::Duration;

/// End-of-run summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Resources written to disk
    pub downloads: u64,

    /// Distinct URLs claimed for fetching
    pub urls_visited: usize,

    /// Fetch rounds launched across both phases
    pub rounds: u64,

    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub elapsed: Duration,
}

impl RunSummary {
    /// Snapshots the statistics at the end of a run
    pub fn from_statistics(stats: &RunStatistics, urls_visited: usize, elapsed: Duration) -> Self {
        Self {
            downloads: stats.downloads(),
            urls_visited,
            rounds: stats.rounds(),
            warnings: stats.warnings(),
            errors: stats.errors(),
            elapsed,
        }
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Replays the summary through the logger
    pub fn report(&self, logger: &dyn CrawlLogger) {
        logger.emphasis("=== Mirror Summary ===");
        logger.success(&format!("Downloaded: {}", self.downloads));
        logger.normal(&format!("URLs visited: {}", self.urls_visited));
        logger.normal(&format!("Fetch rounds: {}", self.rounds));

        if self.warnings.is_empty() {
            logger.normal("Warnings: 0");
        } else {
            logger.warning(&format!("Warnings: {}", self.warnings.len()));
            for warning in &self.warnings {
                logger.warning(&format!("  - {}", warning));
            }
        }

        if self.errors.is_empty() {
            logger.normal("Errors: 0");
        } else {
            logger.error(&format!("Errors: {}", self.errors.len()));
            for error in &self.errors {
                logger.error(&format!("  - {}", error));
            }
        }

        logger.emphasis(&format!("Elapsed: {}", format_elapsed(self.elapsed)));
    }
}

/// Prints the summary to stdout in a formatted manner
pub fn print_summary(summary: &RunSummary) {
    println!("=== Mirror Summary ===\n");

    println!("Overview:");
    println!("  Downloaded: {}", summary.downloads);
    println!("  URLs visited: {}", summary.urls_visited);
    println!("  Fetch rounds: {}", summary.rounds);
    println!("  Elapsed: {}", format_elapsed(summary.elapsed));
    println!();

    println!("Warnings ({}):", summary.warning_count());
    for warning in &summary.warnings {
        println!("  - {}", warning);
    }
    println!();

    println!("Errors ({}):", summary.error_count());
    for error in &summary.errors {
        println!("  - {}", error);
    }
}

/// Formats a duration as `HH:MM:SS.mmm`
pub fn format_elapsed(elapsed: Duration) -> String {
    let total_secs = elapsed.as_secs();
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        total_secs / 3600,
        (total_secs % 3600) / 60,
        total_secs % 60,
        elapsed.subsec_millis()
    )
}
