//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the outer crawl loop that coordinates all aspects of
//! a mirroring run, including:
//! - Verifying the output root and seeding the frontier
//! - Alternating between the frontier and auxiliary phases
//! - Launching and joining bounded-parallel rounds
//! - Producing the end-of-run summary

use crate::config::CrawlSettings;
use crate::crawler::fetcher::build_http_client;
use crate::crawler::scheduler::{CrawlPhase, Scheduler};
use crate::crawler::worker::{self, CrawlContext};
use crate::logging::{CrawlLogger, Severity};
use crate::output::{RunStatistics, RunSummary};
use crate::state::{CrawlState, QueuedUrl};
use crate::storage::FileStore;
use crate::url::{canonical_url, crawl_key, ResourceKind};
use crate::MirrorError;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;

/// Main crawler coordinator structure
///
/// # Example
///
/// ```no_run
/// use site_mirror::config::{Config, CrawlSettings};
/// use site_mirror::{Coordinator, DiskStore, TracingLogger};
/// use std::sync::Arc;
///
/// # async fn example() -> site_mirror::Result<()> {
/// let mut config = Config::default();
/// config.site.base_url = Some("https://example.test/".to_string());
/// let settings = CrawlSettings::from_config(&config)?;
///
/// let coordinator = Coordinator::new(
///     settings,
///     Arc::new(TracingLogger::new()),
///     Arc::new(DiskStore::new()),
/// )?;
/// let summary = coordinator.run().await?;
/// println!("{} files written", summary.downloads);
/// # Ok(())
/// # }
/// ```
pub struct Coordinator {
    ctx: Arc<CrawlContext>,
    scheduler: Scheduler,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `settings` - Validated run settings
    /// * `logger` - Sink for every message the run emits
    /// * `store` - File-writing collaborator
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(MirrorError)` - The HTTP client could not be built
    pub fn new(
        settings: CrawlSettings,
        logger: Arc<dyn CrawlLogger>,
        store: Arc<dyn FileStore>,
    ) -> Result<Self, MirrorError> {
        let client = build_http_client(&settings)?;
        let scheduler = Scheduler::new(settings.workers);

        Ok(Self {
            ctx: Arc::new(CrawlContext {
                settings,
                client,
                state: CrawlState::new(),
                stats: RunStatistics::new(),
                logger,
                store,
            }),
            scheduler,
        })
    }

    /// Shared crawl state, for inspection after a run
    pub fn state(&self) -> &CrawlState {
        &self.ctx.state
    }

    /// Runs the crawl to completion
    ///
    /// Fails only if the output root cannot be prepared; every per-resource
    /// failure is recorded in the returned summary instead.
    pub async fn run(&self) -> Result<RunSummary, MirrorError> {
        let settings = &self.ctx.settings;
        let logger = &self.ctx.logger;
        let start_time = Instant::now();

        self.ctx.store.ensure_root(&settings.output_root).await?;

        logger.emphasis(&format!(
            "Mirroring {} into {} with {} worker(s)",
            settings.base_url,
            settings.output_root.display(),
            self.scheduler.workers()
        ));

        let start_url = canonical_url(&settings.base_url);
        self.ctx.state.enqueue(QueuedUrl {
            key: crawl_key(&start_url),
            url: start_url,
            kind: ResourceKind::Page,
            destination: None,
        });

        let mut phase = CrawlPhase::DrainingFrontier;
        while phase != CrawlPhase::Idle {
            logger.emphasis(&format!("Fetching {}", phase));

            match phase {
                CrawlPhase::DrainingFrontier => self.drain_frontier().await,
                CrawlPhase::DrainingAuxiliary => self.drain_auxiliary().await,
                CrawlPhase::Idle => {}
            }

            phase = phase.next(!self.ctx.state.frontier_is_empty());
        }

        let summary = RunSummary::from_statistics(
            &self.ctx.stats,
            self.ctx.state.visited_count(),
            start_time.elapsed(),
        );
        summary.report(logger.as_ref());

        Ok(summary)
    }

    /// Runs rounds until the frontier is empty
    async fn drain_frontier(&self) {
        loop {
            let batch = self
                .scheduler
                .next_frontier_batch(&self.ctx.state, self.ctx.logger.as_ref());
            if batch.is_empty() {
                break;
            }
            self.run_round(batch).await;
        }
    }

    /// Runs rounds over the auxiliary set collected so far, then clears it
    async fn drain_auxiliary(&self) {
        let mut pending: VecDeque<QueuedUrl> = self.ctx.state.drain_auxiliary().into();
        self.ctx
            .logger
            .normal(&format!("{} auxiliary resource(s) pending", pending.len()));

        loop {
            let batch = self.scheduler.next_auxiliary_batch(
                &mut pending,
                &self.ctx.state,
                self.ctx.logger.as_ref(),
            );
            if batch.is_empty() {
                break;
            }
            self.run_round(batch).await;
        }

        self.ctx.state.clear_auxiliary();
    }

    /// Launches one task per resource and waits for all of them
    async fn run_round(&self, batch: Vec<QueuedUrl>) {
        self.ctx.stats.record_round();
        let announcement = format!(
            "Round {}: {} resource(s)",
            self.ctx.stats.rounds(),
            batch.len()
        );
        self.ctx
            .logger
            .log_async(Severity::Normal, &announcement, None)
            .await;

        let mut tasks = JoinSet::new();
        for queued in batch {
            tasks.spawn(worker::process(Arc::clone(&self.ctx), queued));
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                let message = format!("Worker task failed: {}", e);
                self.ctx.stats.record_error(message.clone());
                self.ctx.logger.error(&message);
            }
        }
    }
}

/// Mirrors the site described by `settings` with the default collaborators
///
/// Log output goes through [`TracingLogger`](crate::logging::TracingLogger)
/// and files are written with [`DiskStore`](crate::storage::DiskStore).
pub async fn run_mirror(settings: CrawlSettings) -> Result<RunSummary, MirrorError> {
    let coordinator = Coordinator::new(
        settings,
        Arc::new(crate::logging::TracingLogger::new()),
        Arc::new(crate::storage::DiskStore::new()),
    )?;

    coordinator.run().await
}
