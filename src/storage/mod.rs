//! Storage module for persisting mirrored resources
//!
//! This module handles everything that touches the output tree:
//! - Mapping URLs onto destination paths under the output root
//! - Collision-safe renaming of query-string variants
//! - Writing resources to disk through the [`FileStore`] collaborator

mod disk;
mod paths;
mod traits;

pub use disk::DiskStore;
pub use paths::{
    derive_collision_safe_path, map_url_to_local_path, rename_reference, ROOT_INDEX_FILE,
};
pub use traits::{FileStore, StorageError, StorageResult};
