//! Scheduler for bounded-parallel fetch rounds
//!
//! This module handles:
//! - Building batches of at most `workers` claimed resources
//! - Suppressing duplicates at dequeue time via the visited set
//! - The phase state machine driven by the coordinator

use crate::logging::CrawlLogger;
use crate::state::{CrawlState, FetchOutcome, QueuedUrl};
use std::collections::VecDeque;
use std::fmt;

/// Phase of the outer crawl loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlPhase {
    /// Fetching pages from the frontier in rounds
    DrainingFrontier,
    /// Fetching the auxiliary resources collected from pages
    DrainingAuxiliary,
    /// Frontier and auxiliary set are both empty
    Idle,
}

impl CrawlPhase {
    /// Phase that follows this one
    ///
    /// `frontier_pending` is only consulted after the auxiliary phase: a
    /// timeout requeue during either phase reopens the frontier.
    pub fn next(self, frontier_pending: bool) -> Self {
        match self {
            Self::DrainingFrontier => Self::DrainingAuxiliary,
            Self::DrainingAuxiliary if frontier_pending => Self::DrainingFrontier,
            Self::DrainingAuxiliary | Self::Idle => Self::Idle,
        }
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DrainingFrontier => write!(f, "pages"),
            Self::DrainingAuxiliary => write!(f, "auxiliary resources"),
            Self::Idle => write!(f, "idle"),
        }
    }
}

/// Builds fetch batches under a fixed worker count
///
/// Every resource placed in a batch has already been claimed in the visited
/// set, so a batch never contains the same key twice and no key is ever in
/// flight in two batches.
///
/// # Example
///
/// ```
/// use site_mirror::crawler::Scheduler;
/// use site_mirror::logging::RecordingLogger;
/// use site_mirror::state::{CrawlState, QueuedUrl};
/// use std::path::PathBuf;
/// use url::Url;
///
/// let state = CrawlState::new();
/// for i in 0..5 {
///     let url = Url::parse(&format!("https://example.test/p{}", i)).unwrap();
///     let key = url.to_string();
///     state.enqueue(QueuedUrl::with_destination(url, key, PathBuf::from("out")));
/// }
///
/// let scheduler = Scheduler::new(2);
/// let logger = RecordingLogger::new();
/// assert_eq!(scheduler.next_frontier_batch(&state, &logger).len(), 2);
/// assert_eq!(scheduler.next_frontier_batch(&state, &logger).len(), 2);
/// assert_eq!(scheduler.next_frontier_batch(&state, &logger).len(), 1);
/// assert!(scheduler.next_frontier_batch(&state, &logger).is_empty());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Scheduler {
    workers: usize,
}

impl Scheduler {
    /// Creates a scheduler; a worker count of 0 is raised to 1
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Dequeues from the frontier until `workers` resources are claimed
    ///
    /// Returns an empty batch only when the frontier is exhausted.
    pub fn next_frontier_batch(
        &self,
        state: &CrawlState,
        logger: &dyn CrawlLogger,
    ) -> Vec<QueuedUrl> {
        self.fill_batch(|| state.try_dequeue(), state, logger)
    }

    /// Takes resources from `pending` until `workers` are claimed
    pub fn next_auxiliary_batch(
        &self,
        pending: &mut VecDeque<QueuedUrl>,
        state: &CrawlState,
        logger: &dyn CrawlLogger,
    ) -> Vec<QueuedUrl> {
        self.fill_batch(|| pending.pop_front(), state, logger)
    }

    fn fill_batch(
        &self,
        mut next: impl FnMut() -> Option<QueuedUrl>,
        state: &CrawlState,
        logger: &dyn CrawlLogger,
    ) -> Vec<QueuedUrl> {
        let mut batch = Vec::with_capacity(self.workers);

        while batch.len() < self.workers {
            let Some(queued) = next() else {
                break;
            };

            if state.try_claim(&queued.key) {
                batch.push(queued);
            } else {
                let outcome = FetchOutcome::SkippedDuplicateVisit;
                logger.log(
                    outcome.severity(),
                    &format!("{} {}", queued.url, outcome),
                    None,
                );
            }
        }

        batch
    }
}
