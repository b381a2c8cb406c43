//! Storage backend contract and the in-memory default.
//!
//! Backends store opaque string values under string keys. They are not
//! expected to understand entries or expire them; [`CacheManager`](super::CacheManager)
//! enforces TTLs on its own. Metadata is offered through [`Storage::set_meta`]
//! for backends that can use it, and silently dropped by those that cannot.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::trace;

use super::entry::CacheMetadata;
use super::error::StorageError;

/// A boxed, `Send` future, as returned by [`Storage`] methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub type StorageResult<T> = Result<T, StorageError>;

/// Key-value operations the cache needs from a backend.
///
/// Methods return boxed futures so the trait can be used as `Arc<dyn Storage>`.
/// Implementations must be `Send + Sync`; one handle is shared by every
/// request, and any atomicity guarantees are the backend's own.
pub trait Storage: Send + Sync {
    /// Short backend name for log fields.
    fn name(&self) -> &'static str;

    /// Reads the value stored under `key`.
    fn get_item<'a>(&'a self, key: &'a str) -> BoxFuture<'a, StorageResult<Option<String>>>;

    /// Writes `value` under `key`, replacing any previous value.
    ///
    /// `ttl` is a hint for backends with native expiry and may be ignored.
    fn set_item<'a>(
        &'a self,
        key: &'a str,
        value: String,
        ttl: Option<Duration>,
    ) -> BoxFuture<'a, StorageResult<()>>;

    /// Deletes `key`. Deleting a missing key is not an error.
    fn remove_item<'a>(&'a self, key: &'a str) -> BoxFuture<'a, StorageResult<()>>;

    /// Lists stored keys, optionally only those starting with `prefix`.
    fn get_keys<'a>(&'a self, prefix: Option<&'a str>) -> BoxFuture<'a, StorageResult<Vec<String>>>;

    /// Deletes every key, or every key starting with `prefix`.
    fn clear<'a>(&'a self, prefix: Option<&'a str>) -> BoxFuture<'a, StorageResult<()>>;

    /// Attaches metadata to `key`. The default implementation discards it.
    fn set_meta<'a>(&'a self, key: &'a str, meta: CacheMetadata) -> BoxFuture<'a, StorageResult<()>> {
        let _ = (key, meta);
        Box::pin(async { Ok(()) })
    }
}

/// Process-local storage backed by a `HashMap`.
///
/// Contents are lost when the value is dropped. Used automatically when no
/// backend is configured; each middleware gets its own instance.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: RwLock<HashMap<String, String>>,
    meta: RwLock<HashMap<String, CacheMetadata>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the metadata recorded for `key`, if any.
    pub async fn meta(&self, key: &str) -> Option<CacheMetadata> {
        self.meta.read().await.get(key).copied()
    }

    /// Number of stored items.
    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

fn matches_prefix(key: &str, prefix: Option<&str>) -> bool {
    prefix.is_none_or(|p| key.starts_with(p))
}

impl Storage for MemoryStorage {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn get_item<'a>(&'a self, key: &'a str) -> BoxFuture<'a, StorageResult<Option<String>>> {
        Box::pin(async move { Ok(self.items.read().await.get(key).cloned()) })
    }

    fn set_item<'a>(
        &'a self,
        key: &'a str,
        value: String,
        ttl: Option<Duration>,
    ) -> BoxFuture<'a, StorageResult<()>> {
        Box::pin(async move {
            if ttl.is_some() {
                trace!(key, "memory storage ignores ttl hint");
            }
            self.items.write().await.insert(key.to_owned(), value);
            Ok(())
        })
    }

    fn remove_item<'a>(&'a self, key: &'a str) -> BoxFuture<'a, StorageResult<()>> {
        Box::pin(async move {
            self.items.write().await.remove(key);
            self.meta.write().await.remove(key);
            Ok(())
        })
    }

    fn get_keys<'a>(&'a self, prefix: Option<&'a str>) -> BoxFuture<'a, StorageResult<Vec<String>>> {
        Box::pin(async move {
            let mut keys: Vec<String> = self
                .items
                .read()
                .await
                .keys()
                .filter(|key| matches_prefix(key, prefix))
                .cloned()
                .collect();
            keys.sort();
            Ok(keys)
        })
    }

    fn clear<'a>(&'a self, prefix: Option<&'a str>) -> BoxFuture<'a, StorageResult<()>> {
        Box::pin(async move {
            self.items
                .write()
                .await
                .retain(|key, _| !matches_prefix(key, prefix));
            self.meta
                .write()
                .await
                .retain(|key, _| !matches_prefix(key, prefix));
            Ok(())
        })
    }

    fn set_meta<'a>(&'a self, key: &'a str, meta: CacheMetadata) -> BoxFuture<'a, StorageResult<()>> {
        Box::pin(async move {
            self.meta.write().await.insert(key.to_owned(), meta);
            Ok(())
        })
    }
}
