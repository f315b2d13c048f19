//! Directory-backed blob store.

use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::backend::BlobStore;
use crate::error::{Error, Result};

/// Stores each blob as a file under a root directory and hands out
/// `file://` URLs.
#[derive(Debug, Clone)]
pub struct DirectoryBlobStore {
    root: PathBuf,
}

impl DirectoryBlobStore {
    /// Create a store rooted at `root`. The directory is created lazily.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `key` under the root, refusing anything that would escape it.
    fn path_for(&self, key: &str) -> Option<PathBuf> {
        let relative = Path::new(key);
        let clean = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
        (clean && !key.is_empty()).then(|| self.root.join(relative))
    }
}

/// `file://` URL for an absolute or relative path.
fn file_url(path: &Path) -> String {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    format!("file://{}", absolute.display())
}

#[async_trait::async_trait]
impl BlobStore for DirectoryBlobStore {
    fn name(&self) -> &'static str {
        "directory"
    }

    async fn upload(&self, key: &str, bytes: &[u8], _content_type: &str) -> Result<String> {
        let path = self
            .path_for(key)
            .ok_or_else(|| Error::upload(key, "key must be a relative path without '..'"))?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::upload(key, e.to_string()))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| Error::upload(key, e.to_string()))?;

        debug!("Stored {} ({} bytes) at {}", key, bytes.len(), path.display());
        Ok(file_url(&path))
    }
}
