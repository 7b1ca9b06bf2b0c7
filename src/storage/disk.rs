use crate::storage::traits::{FileStore, StorageError, StorageResult};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::path::Path;

/// Name of the probe file written while checking the output root
const WRITE_PROBE: &str = ".site-mirror-write-probe";

/// [`FileStore`] backed by the local file system
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskStore;

impl DiskStore {
    pub fn new() -> Self {
        Self
    }
}

impl FileStore for DiskStore {
    fn save_file<'a>(
        &'a self,
        contents: Vec<u8>,
        destination: &'a Path,
    ) -> BoxFuture<'a, StorageResult<()>> {
        async move {
            let parent = destination.parent().ok_or_else(|| {
                StorageError::InvalidDestination(destination.display().to_string())
            })?;

            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }

            tokio::fs::write(destination, contents).await?;
            Ok(())
        }
        .boxed()
    }

    fn ensure_root<'a>(&'a self, root: &'a Path) -> BoxFuture<'a, StorageResult<()>> {
        async move {
            let output_root = |source| StorageError::OutputRoot {
                path: root.display().to_string(),
                source,
            };

            tokio::fs::create_dir_all(root).await.map_err(output_root)?;

            let probe = self.combine_paths(root, WRITE_PROBE);
            tokio::fs::write(&probe, b"").await.map_err(output_root)?;
            tokio::fs::remove_file(&probe).await.map_err(output_root)?;

            Ok(())
        }
        .boxed()
    }
}
