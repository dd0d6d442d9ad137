use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{error, info};

/// Width in pixels requested for stored document images.
pub const IMAGE_WIDTH: u32 = 500;

/// Destination for uploaded image buffers.
///
/// Implementations receive the raw buffer, the public destination path the
/// handlers already wrote into the document's `img_url`, and the target
/// width. Resampling itself happens behind this seam.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn store_resized(&self, data: Vec<u8>, dest: &str, width: u32) -> Result<()>;
}

/// Filesystem-backed image store rooted at a configured directory.
///
/// Persists the buffer under `root`/`dest`; width is passed through for the
/// deployment's image pipeline watching that directory.
#[derive(Debug, Clone)]
pub struct FsImageStore {
    root: PathBuf,
}

impl FsImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl ImageStore for FsImageStore {
    async fn store_resized(&self, data: Vec<u8>, dest: &str, width: u32) -> Result<()> {
        let target = self.root.join(dest);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating image directory {}", parent.display()))?;
        }
        tokio::fs::write(&target, data)
            .await
            .with_context(|| format!("writing image {}", target.display()))?;
        info!(dest, width, "stored uploaded image");
        Ok(())
    }
}

/// Schedules an image store as a detached background task.
///
/// The request that triggered the upload does not wait for the store to
/// finish and never observes its outcome; failures are reported to the log
/// sink instead.
pub fn spawn_store(store: Arc<dyn ImageStore>, data: Vec<u8>, dest: String, width: u32) {
    tokio::spawn(async move {
        if let Err(error) = store.store_resized(data, &dest, width).await {
            error!(%dest, ?error, "failed to store uploaded image");
        }
    });
}
