//! Stored forms of a cached response and its side record.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// A response as it is written to storage.
///
/// Encoded as JSON with camelCase field names. Headers are kept as ordered
/// `[name, value]` pairs so repeated names and the original casing survive.
///
/// `cached_at` is set once, when the entry is created, and reads never touch it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub body: String,
    pub headers: Vec<(String, String)>,
    pub status: u16,
    pub status_text: String,
    /// Creation time in epoch milliseconds.
    pub cached_at: u64,
}

impl CacheEntry {
    /// Epoch millisecond after which the entry is stale under `ttl`.
    pub fn expires_at(&self, ttl: Duration) -> u64 {
        self.cached_at.saturating_add(duration_millis(ttl))
    }

    /// Returns `true` once `now` is strictly past [`expires_at`](Self::expires_at).
    pub fn is_expired(&self, ttl: Duration, now: u64) -> bool {
        now > self.expires_at(ttl)
    }
}

/// Optional side record written next to an entry when a TTL is configured.
///
/// Advisory only: backends may use `expires` for native eviction, but expiry
/// is always enforced from [`CacheEntry::cached_at`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheMetadata {
    /// Mirrors [`CacheEntry::cached_at`].
    pub mtime: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<u64>,
}

impl CacheMetadata {
    /// Builds the record for `entry`; `expires` is set only when `ttl` is.
    pub fn for_entry(entry: &CacheEntry, ttl: Option<Duration>) -> Self {
        Self {
            mtime: entry.cached_at,
            expires: ttl.map(|ttl| entry.expires_at(ttl)),
        }
    }
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(duration_millis)
        .unwrap_or(0)
}

fn duration_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_at(cached_at: u64) -> CacheEntry {
        CacheEntry {
            body: "{}".into(),
            headers: vec![],
            status: 200,
            status_text: "OK".into(),
            cached_at,
        }
    }

    #[test]
    fn expiry_boundary_is_inclusive() {
        let entry = entry_at(10_000);
        let ttl = Duration::from_secs(1);
        assert_eq!(entry.expires_at(ttl), 11_000);
        assert!(!entry.is_expired(ttl, 10_000));
        assert!(!entry.is_expired(ttl, 11_000));
        assert!(entry.is_expired(ttl, 11_001));
    }

    #[test]
    fn huge_ttl_saturates() {
        let entry = entry_at(u64::MAX - 5);
        assert!(!entry.is_expired(Duration::from_secs(60), u64::MAX));
    }

    #[test]
    fn metadata_mirrors_entry() {
        let entry = entry_at(5_000);
        let meta = CacheMetadata::for_entry(&entry, Some(Duration::from_secs(30)));
        assert_eq!(meta.mtime, 5_000);
        assert_eq!(meta.expires, Some(35_000));

        let meta = CacheMetadata::for_entry(&entry, None);
        assert_eq!(meta.expires, None);
    }

    #[test]
    fn json_uses_camel_case_fields() {
        let mut entry = entry_at(42);
        entry.headers.push(("Content-Type".into(), "application/json".into()));
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["statusText"], "OK");
        assert_eq!(json["cachedAt"], 42);
        assert_eq!(json["headers"][0][0], "Content-Type");

        let back: CacheEntry = serde_json::from_value(json).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn now_is_after_2020() {
        assert!(now_millis() > 1_577_836_800_000);
    }
}
