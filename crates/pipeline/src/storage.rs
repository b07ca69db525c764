//! Persistence of downloaded images.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use quill_core::naming;

/// Destination for finished image bytes.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Write `bytes` under `file_name` and return the path written.
    async fn write(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf, std::io::Error>;
}

/// Writes images to `{root}/{YYYYMMDD}/`, creating the day folder on
/// first use.
#[derive(Debug, Clone)]
pub struct LocalImageStore {
    root: PathBuf,
}

impl LocalImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn write(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf, std::io::Error> {
        let dir = self.root.join(naming::day_folder(chrono::Utc::now()));
        tokio::fs::create_dir_all(&dir).await?;

        let path = dir.join(file_name);
        tokio::fs::write(&path, bytes).await?;

        tracing::debug!(path = %path.display(), size = bytes.len(), "Image written");
        Ok(path)
    }
}
