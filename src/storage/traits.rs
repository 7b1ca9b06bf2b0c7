//! Storage traits and error types
//!
//! This module defines the file-writing collaborator the crawler persists
//! resources through, and its error type.

use crate::storage::paths;
use futures::future::BoxFuture;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Destination {0} has no parent directory")]
    InvalidDestination(String),

    #[error("Output root {path} is not writable: {source}")]
    OutputRoot {
        path: String,
        source: std::io::Error,
    },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// File-writing collaborator used by the crawler
///
/// Only `save_file` and `ensure_root` touch the file system; the path
/// operations have pure default implementations. Implementations must be
/// safe to share between worker tasks.
pub trait FileStore: Send + Sync {
    /// Maps an absolute URL to its destination under `root`
    fn map_url_to_local_path(&self, root: &Path, url: &Url) -> PathBuf {
        paths::map_url_to_local_path(root, url)
    }

    /// Writes `contents` to `destination`
    ///
    /// Intermediate directories are created as needed and an existing file
    /// at `destination` is overwritten.
    fn save_file<'a>(
        &'a self,
        contents: Vec<u8>,
        destination: &'a Path,
    ) -> BoxFuture<'a, StorageResult<()>>;

    /// Derives the collision-safe `(url, path)` pair for a query-string variant
    fn modify_paths(&self, original_url: &str, original_path: &Path) -> (String, PathBuf) {
        paths::derive_collision_safe_path(original_url, original_path)
    }

    /// Joins two path fragments
    fn combine_paths(&self, base: &Path, relative: &str) -> PathBuf {
        base.join(relative)
    }

    /// Creates the output root and verifies it can be written to
    fn ensure_root<'a>(&'a self, root: &'a Path) -> BoxFuture<'a, StorageResult<()>>;
}
