//! Directory-backed storage adapter.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, instrument};

use super::{Namespace, Storage, StorageError};

/// Stores each namespace as `<dir>/<namespace>.json`.
///
/// Writes go to a sibling temporary file that is then renamed over the
/// target, so a crash mid-write leaves the previous document intact.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Use `dir` as the data directory. It is created on first save.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The data directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, namespace: Namespace) -> PathBuf {
        self.dir.join(format!("{}.json", namespace.key()))
    }
}

#[async_trait]
impl Storage for FileStorage {
    #[instrument(skip(self), fields(dir = %self.dir.display()))]
    async fn load(&self, namespace: Namespace) -> Result<Option<serde_json::Value>, StorageError> {
        let bytes = match tokio::fs::read(self.path_for(namespace)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StorageError::Io { namespace, source }),
        };

        let value = serde_json::from_slice(&bytes)
            .map_err(|source| StorageError::Corrupt { namespace, source })?;
        Ok(Some(value))
    }

    #[instrument(skip(self, value), fields(dir = %self.dir.display()))]
    async fn save(&self, namespace: Namespace, value: serde_json::Value) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec_pretty(&value)
            .map_err(|source| StorageError::Encode { namespace, source })?;
        let io = |source| StorageError::Io { namespace, source };

        tokio::fs::create_dir_all(&self.dir).await.map_err(io)?;

        let target = self.path_for(namespace);
        let staging = target.with_extension("json.tmp");
        tokio::fs::write(&staging, &bytes).await.map_err(io)?;
        tokio::fs::rename(&staging, &target).await.map_err(io)?;

        debug!(bytes = bytes.len(), "Saved document");
        Ok(())
    }

    #[instrument(skip(self), fields(dir = %self.dir.display()))]
    async fn remove(&self, namespace: Namespace) -> Result<(), StorageError> {
        match tokio::fs::remove_file(self.path_for(namespace)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io { namespace, source }),
        }
    }
}
