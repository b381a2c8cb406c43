//! Storage-facing cache operations with lazy TTL enforcement.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::entry::{CacheEntry, CacheMetadata, now_millis};
use super::error::CacheResult;
use super::storage::Storage;

/// Reads and writes [`CacheEntry`] values through a [`Storage`] backend.
///
/// Expiry is lazy: an entry is checked against the TTL only when read, and an
/// expired one is deleted at that point. Nothing sweeps entries that are never
/// read again; they stay until overwritten, cleared, or evicted by the backend.
///
/// [`get`](Self::get) and [`set`](Self::set) are fail-open: backend errors are
/// logged and turn into a miss or a skipped write. The remaining operations
/// pass backend results straight through.
///
/// The manager holds only its configuration and the backend handle.
pub struct CacheManager {
    storage: Arc<dyn Storage>,
    ttl: Option<Duration>,
}

impl CacheManager {
    /// Creates a manager over `storage`. With `ttl` unset, entries never expire.
    pub fn new(storage: Arc<dyn Storage>, ttl: Option<Duration>) -> Self {
        Self { storage, ttl }
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    pub fn storage_name(&self) -> &'static str {
        self.storage.name()
    }

    /// Returns the live entry under `key`, deleting it instead if it has expired.
    ///
    /// Undecodable values and backend failures are reported as absent.
    pub async fn get(&self, key: &str) -> Option<CacheEntry> {
        let raw = match self.storage.get_item(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, backend = self.storage.name(), error = %e, "cache read failed, treating as miss");
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key, error = %e, "undecodable cache entry, treating as miss");
                return None;
            }
        };

        if self.ttl.is_some_and(|ttl| entry.is_expired(ttl, now_millis())) {
            debug!(key, cached_at = entry.cached_at, "cache entry expired");
            if let Err(e) = self.storage.remove_item(key).await {
                warn!(key, backend = self.storage.name(), error = %e, "failed to delete expired entry");
            }
            return None;
        }

        Some(entry)
    }

    /// Stores `entry` under `key`, plus metadata when a TTL is configured.
    ///
    /// Never fails; a write that does not go through is logged and dropped.
    /// A metadata write that fails leaves the stored entry in place.
    pub async fn set(&self, key: &str, entry: &CacheEntry) {
        if let Err(e) = self.write_item(key, entry).await {
            warn!(key, backend = self.storage.name(), error = %e, "cache write failed, skipping");
            return;
        }
        debug!(key, "cache entry stored");

        if self.ttl.is_some() {
            let meta = CacheMetadata::for_entry(entry, self.ttl);
            if let Err(e) = self.storage.set_meta(key, meta).await {
                warn!(key, backend = self.storage.name(), error = %e, "cache metadata write failed, entry kept");
            }
        }
    }

    async fn write_item(&self, key: &str, entry: &CacheEntry) -> CacheResult<()> {
        let raw = serde_json::to_string(entry)?;
        self.storage.set_item(key, raw, self.ttl).await?;
        Ok(())
    }

    /// Returns `true` if [`get`](Self::get) would return an entry.
    pub async fn has(&self, key: &str) -> bool {
        self.get(key).await.is_some()
    }

    pub async fn delete(&self, key: &str) -> CacheResult<()> {
        Ok(self.storage.remove_item(key).await?)
    }

    /// Removes every key in the backend, not only this cache's namespace.
    pub async fn clear(&self) -> CacheResult<()> {
        Ok(self.storage.clear(None).await?)
    }

    pub async fn keys(&self) -> CacheResult<Vec<String>> {
        Ok(self.storage.get_keys(None).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::error::StorageError;
    use crate::cache::storage::{BoxFuture, MemoryStorage, StorageResult};

    /// Memory storage that refuses every metadata write.
    struct NoMetaStorage(MemoryStorage);

    impl Storage for NoMetaStorage {
        fn name(&self) -> &'static str {
            "no-meta"
        }

        fn get_item<'a>(&'a self, key: &'a str) -> BoxFuture<'a, StorageResult<Option<String>>> {
            self.0.get_item(key)
        }

        fn set_item<'a>(
            &'a self,
            key: &'a str,
            value: String,
            ttl: Option<Duration>,
        ) -> BoxFuture<'a, StorageResult<()>> {
            self.0.set_item(key, value, ttl)
        }

        fn remove_item<'a>(&'a self, key: &'a str) -> BoxFuture<'a, StorageResult<()>> {
            self.0.remove_item(key)
        }

        fn get_keys<'a>(&'a self, prefix: Option<&'a str>) -> BoxFuture<'a, StorageResult<Vec<String>>> {
            self.0.get_keys(prefix)
        }

        fn clear<'a>(&'a self, prefix: Option<&'a str>) -> BoxFuture<'a, StorageResult<()>> {
            self.0.clear(prefix)
        }

        fn set_meta<'a>(&'a self, _key: &'a str, _meta: CacheMetadata) -> BoxFuture<'a, StorageResult<()>> {
            Box::pin(async { Err(StorageError::Unavailable("metadata not supported".into())) })
        }
    }

    fn entry(cached_at: u64) -> CacheEntry {
        CacheEntry {
            body: r#"{"count":1}"#.into(),
            headers: vec![("Content-Type".into(), "application/json".into())],
            status: 200,
            status_text: "OK".into(),
            cached_at,
        }
    }

    async fn put_raw(storage: &MemoryStorage, key: &str, entry: &CacheEntry) {
        storage
            .set_item(key, serde_json::to_string(entry).unwrap(), None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn set_then_get() {
        let manager = CacheManager::new(Arc::new(MemoryStorage::new()), None);
        let stored = entry(now_millis());
        manager.set("n:k", &stored).await;

        assert_eq!(manager.get("n:k").await, Some(stored));
        assert!(manager.has("n:k").await);
        assert!(!manager.has("n:other").await);
    }

    #[tokio::test]
    async fn without_ttl_entries_never_expire() {
        let storage = Arc::new(MemoryStorage::new());
        let manager = CacheManager::new(storage.clone(), None);
        // Written in 1970.
        put_raw(&storage, "k", &entry(0)).await;
        assert!(manager.get("k").await.is_some());
        assert_eq!(storage.meta("k").await, None);
    }

    #[tokio::test]
    async fn ttl_boundary() {
        let storage = Arc::new(MemoryStorage::new());
        let manager = CacheManager::new(storage.clone(), Some(Duration::from_secs(1)));
        let now = now_millis();

        put_raw(&storage, "fresh", &entry(now - 900)).await;
        put_raw(&storage, "stale", &entry(now - 1_500)).await;

        assert!(manager.get("fresh").await.is_some());
        assert!(manager.get("stale").await.is_none());
    }

    #[tokio::test]
    async fn expired_read_deletes_the_key() {
        let storage = Arc::new(MemoryStorage::new());
        let manager = CacheManager::new(storage.clone(), Some(Duration::from_secs(10)));
        put_raw(&storage, "old", &entry(now_millis() - 60_000)).await;
        assert_eq!(manager.keys().await.unwrap(), vec!["old"]);

        assert!(manager.get("old").await.is_none());
        assert!(manager.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn ttl_writes_metadata() {
        let storage = Arc::new(MemoryStorage::new());
        let manager = CacheManager::new(storage.clone(), Some(Duration::from_secs(60)));
        let stored = entry(1_000);
        manager.set("k", &stored).await;

        let meta = storage.meta("k").await.unwrap();
        assert_eq!(meta.mtime, 1_000);
        assert_eq!(meta.expires, Some(61_000));
    }

    #[tokio::test]
    async fn failed_metadata_write_keeps_the_entry() {
        let manager = CacheManager::new(
            Arc::new(NoMetaStorage(MemoryStorage::new())),
            Some(Duration::from_secs(60)),
        );
        let stored = entry(now_millis());
        manager.set("k", &stored).await;

        assert_eq!(manager.get("k").await, Some(stored));
    }

    #[tokio::test]
    async fn corrupt_value_is_a_miss() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_item("k", "not json".into(), None).await.unwrap();
        let manager = CacheManager::new(storage, None);
        assert!(manager.get("k").await.is_none());
    }

    #[tokio::test]
    async fn delete_and_clear_pass_through() {
        let manager = CacheManager::new(Arc::new(MemoryStorage::new()), None);
        manager.set("a", &entry(now_millis())).await;
        manager.set("b", &entry(now_millis())).await;

        manager.delete("a").await.unwrap();
        assert_eq!(manager.keys().await.unwrap(), vec!["b"]);

        manager.clear().await.unwrap();
        assert!(manager.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rewrite_replaces_entry() {
        let manager = CacheManager::new(Arc::new(MemoryStorage::new()), None);
        let first = entry(now_millis());
        let mut second = entry(now_millis());
        second.body = r#"{"count":2}"#.into();

        manager.set("k", &first).await;
        manager.set("k", &second).await;
        assert_eq!(manager.get("k").await.unwrap().body, r#"{"count":2}"#);
    }
}
