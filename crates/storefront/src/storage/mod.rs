//! Persistence port for cart, order and account state.
//!
//! # Namespaces
//!
//! State is stored as JSON documents, one per [`Namespace`]:
//!
//! - `cart` - the current cart lines
//! - `orders` - every order ever created, newest first
//! - `user` - the signed-in customer profile
//!
//! # Adapters
//!
//! - [`MemoryStorage`] - in-process map, used by tests
//! - [`FileStorage`] - one `<namespace>.json` file per namespace
//!
//! Domain code never talks to an adapter directly; it goes through
//! [`BoundedStorage`], which applies the configured timeout so a slow backend
//! surfaces as a recoverable [`StorageError::Timeout`] instead of a hang.

mod file;
mod memory;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::Instrument;

pub use file::FileStorage;
pub use memory::MemoryStorage;

/// A storage namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Cart,
    Orders,
    User,
}

impl Namespace {
    /// Key used by adapters (file stem, map key).
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Cart => "cart",
            Self::Orders => "orders",
            Self::User => "user",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Errors raised by the persistence port.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Backend I/O failed.
    #[error("storage I/O error in {namespace}: {source}")]
    Io {
        namespace: Namespace,
        #[source]
        source: std::io::Error,
    },

    /// Stored document could not be decoded.
    #[error("stored {namespace} data is corrupt: {source}")]
    Corrupt {
        namespace: Namespace,
        #[source]
        source: serde_json::Error,
    },

    /// Value could not be encoded.
    #[error("could not encode {namespace} data: {source}")]
    Encode {
        namespace: Namespace,
        #[source]
        source: serde_json::Error,
    },

    /// Backend did not answer within the configured timeout.
    #[error("storage timed out after {timeout_ms}ms while accessing {namespace}")]
    Timeout { namespace: Namespace, timeout_ms: u128 },

    /// Backend refused the operation.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Persistence port.
///
/// Adapters store opaque JSON documents. `load` returns `None` when nothing
/// was ever saved under the namespace.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Load the document stored under `namespace`.
    async fn load(&self, namespace: Namespace) -> Result<Option<serde_json::Value>, StorageError>;

    /// Replace the document stored under `namespace`.
    async fn save(&self, namespace: Namespace, value: serde_json::Value) -> Result<(), StorageError>;

    /// Forget the document stored under `namespace`. Removing nothing is not an error.
    async fn remove(&self, namespace: Namespace) -> Result<(), StorageError>;
}

/// A storage port with a deadline on every call.
///
/// Cheap to clone.
#[derive(Clone)]
pub struct BoundedStorage {
    port: Arc<dyn Storage>,
    timeout: Duration,
}

impl BoundedStorage {
    /// Wrap `port`, failing any call that takes longer than `timeout`.
    #[must_use]
    pub fn new(port: Arc<dyn Storage>, timeout: Duration) -> Self {
        Self { port, timeout }
    }

    /// Load and decode a typed document.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Timeout` if the backend is too slow,
    /// `StorageError::Corrupt` if the stored JSON does not decode into `T`,
    /// or the adapter's own error.
    pub async fn load<T: DeserializeOwned>(&self, namespace: Namespace) -> Result<Option<T>, StorageError> {
        let value = self.bounded(namespace, self.port.load(namespace)).await?;
        value
            .map(|value| {
                serde_json::from_value(value)
                    .map_err(|source| StorageError::Corrupt { namespace, source })
            })
            .transpose()
    }

    /// Encode and save a typed document.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Timeout` if the backend is too slow,
    /// `StorageError::Encode` if `value` cannot be encoded, or the adapter's
    /// own error.
    pub async fn save<T: Serialize + Sync>(&self, namespace: Namespace, value: &T) -> Result<(), StorageError> {
        let value = serde_json::to_value(value)
            .map_err(|source| StorageError::Encode { namespace, source })?;
        self.bounded(namespace, self.port.save(namespace, value)).await
    }

    /// Start saving a typed document on its own task.
    ///
    /// Unlike [`BoundedStorage::save`], a write that outlives the deadline is
    /// not abandoned: the returned [`PendingSave`] can be waited on again
    /// until the write settles.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Encode` if `value` cannot be encoded.
    pub fn spawn_save<T: Serialize>(&self, namespace: Namespace, value: &T) -> Result<PendingSave, StorageError> {
        let value = serde_json::to_value(value)
            .map_err(|source| StorageError::Encode { namespace, source })?;
        let port = Arc::clone(&self.port);
        let handle = tokio::spawn(async move { port.save(namespace, value).await }.in_current_span());
        Ok(PendingSave {
            namespace,
            timeout: self.timeout,
            handle,
        })
    }

    /// Remove a document.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Timeout` if the backend is too slow, or the
    /// adapter's own error.
    pub async fn remove(&self, namespace: Namespace) -> Result<(), StorageError> {
        self.bounded(namespace, self.port.remove(namespace)).await
    }

    async fn bounded<T>(
        &self,
        namespace: Namespace,
        call: impl Future<Output = Result<T, StorageError>>,
    ) -> Result<T, StorageError> {
        tokio::time::timeout(self.timeout, call).await.map_err(|_| {
            tracing::warn!(%namespace, timeout_ms = self.timeout.as_millis(), "Storage call timed out");
            StorageError::Timeout {
                namespace,
                timeout_ms: self.timeout.as_millis(),
            }
        })?
    }
}

/// A save running on its own task. Dropping it does not stop the write.
#[derive(Debug)]
pub struct PendingSave {
    namespace: Namespace,
    timeout: Duration,
    handle: JoinHandle<Result<(), StorageError>>,
}

/// Where a [`PendingSave`] stands after one wait.
#[derive(Debug)]
pub enum SaveOutcome {
    /// The document was written.
    Saved,
    /// The write failed; nothing was stored.
    Failed(StorageError),
    /// The deadline passed and the write may still land.
    Running(PendingSave),
}

impl PendingSave {
    /// Wait up to the storage timeout for the write to settle.
    pub async fn wait(mut self) -> SaveOutcome {
        match tokio::time::timeout(self.timeout, &mut self.handle).await {
            Ok(Ok(Ok(()))) => SaveOutcome::Saved,
            Ok(Ok(Err(err))) => SaveOutcome::Failed(err),
            Ok(Err(err)) => SaveOutcome::Failed(StorageError::Unavailable(format!("save task failed: {err}"))),
            Err(_) => SaveOutcome::Running(self),
        }
    }

    /// The error reported while the write is still running.
    #[must_use]
    pub fn timeout_error(&self) -> StorageError {
        StorageError::Timeout {
            namespace: self.namespace,
            timeout_ms: self.timeout.as_millis(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// A port that never answers.
    struct Stalled;

    #[async_trait]
    impl Storage for Stalled {
        async fn load(&self, _: Namespace) -> Result<Option<serde_json::Value>, StorageError> {
            std::future::pending().await
        }

        async fn save(&self, _: Namespace, _: serde_json::Value) -> Result<(), StorageError> {
            std::future::pending().await
        }

        async fn remove(&self, _: Namespace) -> Result<(), StorageError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_stalled_backend_times_out() {
        let storage = BoundedStorage::new(Arc::new(Stalled), Duration::from_millis(50));
        let err = storage.save(Namespace::Cart, &vec![1, 2, 3]).await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::Timeout {
                namespace: Namespace::Cart,
                timeout_ms: 50
            }
        ));
    }

    /// A port whose saves land after `delay`.
    struct Late {
        delay: Duration,
        memory: MemoryStorage,
    }

    #[async_trait]
    impl Storage for Late {
        async fn load(&self, namespace: Namespace) -> Result<Option<serde_json::Value>, StorageError> {
            self.memory.load(namespace).await
        }

        async fn save(&self, namespace: Namespace, value: serde_json::Value) -> Result<(), StorageError> {
            tokio::time::sleep(self.delay).await;
            self.memory.save(namespace, value).await
        }

        async fn remove(&self, namespace: Namespace) -> Result<(), StorageError> {
            self.memory.remove(namespace).await
        }
    }

    #[tokio::test]
    async fn test_spawned_save_keeps_running_past_deadline() {
        let late = Arc::new(Late {
            delay: Duration::from_millis(150),
            memory: MemoryStorage::new(),
        });
        let storage = BoundedStorage::new(late.clone(), Duration::from_millis(100));

        let write = storage.spawn_save(Namespace::Orders, &vec![1_u32]).unwrap();
        let SaveOutcome::Running(write) = write.wait().await else {
            panic!("write should still be running after the first deadline");
        };
        assert!(matches!(
            write.timeout_error(),
            StorageError::Timeout { namespace: Namespace::Orders, .. }
        ));
        assert!(late.memory.document(Namespace::Orders).is_none());

        assert!(matches!(write.wait().await, SaveOutcome::Saved));
        assert_eq!(late.memory.document(Namespace::Orders), Some(serde_json::json!([1])));
    }

    #[tokio::test]
    async fn test_dropped_pending_save_still_lands() {
        let late = Arc::new(Late {
            delay: Duration::from_millis(30),
            memory: MemoryStorage::new(),
        });
        let storage = BoundedStorage::new(late.clone(), Duration::from_secs(1));

        drop(storage.spawn_save(Namespace::Cart, &vec![2_u32]).unwrap());
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(late.memory.document(Namespace::Cart), Some(serde_json::json!([2])));
    }

    #[tokio::test]
    async fn test_typed_roundtrip() {
        let storage = BoundedStorage::new(Arc::new(MemoryStorage::new()), Duration::from_secs(1));
        assert!(storage.load::<Vec<u32>>(Namespace::Orders).await.unwrap().is_none());

        storage.save(Namespace::Orders, &vec![7_u32, 8]).await.unwrap();
        let loaded: Vec<u32> = storage.load(Namespace::Orders).await.unwrap().unwrap();
        assert_eq!(loaded, vec![7, 8]);

        storage.remove(Namespace::Orders).await.unwrap();
        assert!(storage.load::<Vec<u32>>(Namespace::Orders).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_undecodable_document_is_corrupt() {
        let memory = Arc::new(MemoryStorage::new());
        memory
            .save(Namespace::Cart, serde_json::json!({"not": "a list"}))
            .await
            .unwrap();
        let storage = BoundedStorage::new(memory, Duration::from_secs(1));
        let err = storage.load::<Vec<u32>>(Namespace::Cart).await.unwrap_err();
        assert!(matches!(err, StorageError::Corrupt { namespace: Namespace::Cart, .. }));
    }

    #[test]
    fn test_namespace_keys() {
        assert_eq!(Namespace::Cart.key(), "cart");
        assert_eq!(Namespace::Orders.to_string(), "orders");
        assert_eq!(Namespace::User.key(), "user");
    }
}
