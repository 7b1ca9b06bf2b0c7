use crate::url::{NormalizedLink, ResourceKind};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use url::Url;

/// A resource waiting to be fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedUrl {
    /// The URL to request
    pub url: Url,

    /// Visited-set key; compared case-insensitively
    pub key: String,

    /// Whether the resource is drilled into after fetching
    pub kind: ResourceKind,

    /// Overrides the mapped destination (collision-safe variants)
    pub destination: Option<PathBuf>,
}

impl QueuedUrl {
    /// Queues a discovered link by its canonical (query-stripped) URL
    pub fn from_link(link: &NormalizedLink, kind: ResourceKind) -> Self {
        Self {
            url: link.url.clone(),
            key: link.key.clone(),
            kind,
            destination: None,
        }
    }

    /// Queues a stylesheet reference, keeping its query string
    pub fn with_destination(url: Url, key: String, destination: PathBuf) -> Self {
        Self {
            url,
            key,
            kind: ResourceKind::Auxiliary,
            destination: Some(destination),
        }
    }
}

/// Auxiliary resources in discovery order, deduplicated by key
#[derive(Debug, Default)]
struct AuxiliarySet {
    entries: Vec<QueuedUrl>,
    keys: HashSet<String>,
}

/// Shared frontier and dedup state for one run
///
/// Every operation takes a single short-lived lock and never awaits while
/// holding it, so all methods are safe to call from any worker task.
///
/// # Example
///
/// ```
/// use site_mirror::state::CrawlState;
///
/// let state = CrawlState::new();
/// assert!(state.try_claim("https://example.test/about"));
/// assert!(!state.try_claim("https://EXAMPLE.test/About"));
/// state.release("https://example.test/about");
/// assert!(state.try_claim("https://example.test/about"));
/// ```
#[derive(Debug, Default)]
pub struct CrawlState {
    frontier: Mutex<VecDeque<QueuedUrl>>,
    visited: Mutex<HashSet<String>>,
    written_paths: Mutex<HashSet<String>>,
    auxiliary: Mutex<AuxiliarySet>,
    timeout_retries: Mutex<HashMap<String, u32>>,
    derived_paths: Mutex<HashMap<String, Option<PathBuf>>>,
}

impl CrawlState {
    pub fn new() -> Self {
        Self::default()
    }

    // ===== Visited set =====

    /// Atomically marks `key` as visited; false if it already was
    pub fn try_claim(&self, key: &str) -> bool {
        lock(&self.visited).insert(fold(key))
    }

    /// Removes `key` from the visited set so it can be claimed again
    pub fn release(&self, key: &str) {
        lock(&self.visited).remove(&fold(key));
    }

    pub fn is_visited(&self, key: &str) -> bool {
        lock(&self.visited).contains(&fold(key))
    }

    pub fn visited_count(&self) -> usize {
        lock(&self.visited).len()
    }

    // ===== Frontier =====

    pub fn enqueue(&self, queued: QueuedUrl) {
        lock(&self.frontier).push_back(queued);
    }

    pub fn try_dequeue(&self) -> Option<QueuedUrl> {
        lock(&self.frontier).pop_front()
    }

    pub fn frontier_len(&self) -> usize {
        lock(&self.frontier).len()
    }

    pub fn frontier_is_empty(&self) -> bool {
        lock(&self.frontier).is_empty()
    }

    // ===== Auxiliary set =====

    /// Adds an auxiliary resource; false if its key is already pending
    pub fn add_auxiliary(&self, queued: QueuedUrl) -> bool {
        let mut aux = lock(&self.auxiliary);
        if !aux.keys.insert(fold(&queued.key)) {
            return false;
        }
        aux.entries.push(queued);
        true
    }

    /// Takes every pending auxiliary resource, leaving the set empty
    ///
    /// Resources added while the returned batch is processed are kept for
    /// the next drain.
    pub fn drain_auxiliary(&self) -> Vec<QueuedUrl> {
        let mut aux = lock(&self.auxiliary);
        aux.keys.clear();
        std::mem::take(&mut aux.entries)
    }

    pub fn auxiliary_len(&self) -> usize {
        lock(&self.auxiliary).entries.len()
    }

    /// Discards pending auxiliary resources
    pub fn clear_auxiliary(&self) {
        let mut aux = lock(&self.auxiliary);
        aux.entries.clear();
        aux.keys.clear();
    }

    // ===== Written paths =====

    /// Atomically marks `path` as written; false if it already was
    ///
    /// Paths are compared case-insensitively.
    pub fn try_claim_path(&self, path: &Path) -> bool {
        lock(&self.written_paths).insert(fold(&path.to_string_lossy()))
    }

    pub fn written_count(&self) -> usize {
        lock(&self.written_paths).len()
    }

    // ===== Timeout retries =====

    /// Records a timeout for `key` and returns how many it has had
    pub fn record_timeout(&self, key: &str) -> u32 {
        let mut retries = lock(&self.timeout_retries);
        let count = retries.entry(fold(key)).or_insert(0);
        *count += 1;
        *count
    }

    // ===== Collision-safe destinations =====

    /// Returns the destination derived for `key`, deriving it on first use
    ///
    /// The boolean is true when `derive` ran, i.e. the caller is the first to
    /// reference this key and is responsible for fetching it. `None` means
    /// the first fetch failed and the key was abandoned.
    pub fn derived_path(
        &self,
        key: &str,
        derive: impl FnOnce() -> PathBuf,
    ) -> Option<(PathBuf, bool)> {
        let mut derived = lock(&self.derived_paths);
        match derived.get(&fold(key)) {
            Some(Some(path)) => Some((path.clone(), false)),
            Some(None) => None,
            None => {
                let path = derive();
                derived.insert(fold(key), Some(path.clone()));
                Some((path, true))
            }
        }
    }

    /// Marks `key` as never written; later references keep their original text
    pub fn abandon_derived_path(&self, key: &str) {
        lock(&self.derived_paths).insert(fold(key), None);
    }
}

fn fold(key: &str) -> String {
    key.to_lowercase()
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
