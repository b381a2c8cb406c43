//! Cache configuration: the programmatic builder and its serde counterpart.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::key::KeySource;
use super::storage::Storage;

/// Namespace used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "cache";

/// Configuration for one [`CacheMiddleware`](super::CacheMiddleware).
///
/// | Setting                  | Default                          |
/// |--------------------------|----------------------------------|
/// | namespace                | `"cache"`                        |
/// | ttl                      | none (entries never expire)      |
/// | cacheable status codes   | `{200}`                          |
/// | key function             | `"<METHOD>:<full URL>"`          |
/// | bypass method check      | `false` (only `GET` is cached)   |
/// | storage                  | a fresh in-memory map            |
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use std::time::Duration;
/// use response_cache::Request;
/// use response_cache::cache::{CacheOptions, KeySource, MemoryStorage};
///
/// let options = CacheOptions::new()
///     .namespace(KeySource::from_fn(|req: &Request| {
///         req.headers().get("x-tenant").unwrap_or("public").to_owned()
///     }))
///     .ttl(Duration::from_secs(30))
///     .cacheable_status_codes([200, 404])
///     .storage(Arc::new(MemoryStorage::new()));
/// ```
pub struct CacheOptions {
    pub(crate) namespace: KeySource,
    pub(crate) ttl: Option<Duration>,
    pub(crate) cacheable_status_codes: HashSet<u16>,
    pub(crate) key_fn: Option<KeySource>,
    pub(crate) bypass_method_check: bool,
    pub(crate) storage: Option<Arc<dyn Storage>>,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheOptions {
    pub fn new() -> Self {
        Self {
            namespace: KeySource::from(DEFAULT_NAMESPACE),
            ttl: None,
            cacheable_status_codes: HashSet::from([200]),
            key_fn: None,
            bypass_method_check: false,
            storage: None,
        }
    }

    /// Sets the key prefix, either a fixed string or a [`KeySource`].
    #[must_use]
    pub fn namespace(mut self, namespace: impl Into<KeySource>) -> Self {
        self.namespace = namespace.into();
        self
    }

    #[must_use]
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    #[must_use]
    pub fn ttl_seconds(self, seconds: u64) -> Self {
        self.ttl(Duration::from_secs(seconds))
    }

    /// Replaces the set of status codes eligible for caching.
    #[must_use]
    pub fn cacheable_status_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.cacheable_status_codes = codes.into_iter().collect();
        self
    }

    /// Replaces the default `"<METHOD>:<full URL>"` key. The output is used verbatim.
    #[must_use]
    pub fn key_fn(mut self, key_fn: KeySource) -> Self {
        self.key_fn = Some(key_fn);
        self
    }

    /// When `true`, responses to any method may be cached, not only `GET`.
    #[must_use]
    pub fn bypass_method_check(mut self, bypass: bool) -> Self {
        self.bypass_method_check = bypass;
        self
    }

    #[must_use]
    pub fn storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }
}

impl fmt::Debug for CacheOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheOptions")
            .field("namespace", &self.namespace)
            .field("ttl", &self.ttl)
            .field("cacheable_status_codes", &self.cacheable_status_codes)
            .field("key_fn", &self.key_fn)
            .field("bypass_method_check", &self.bypass_method_check)
            .field("storage", &self.storage.as_ref().map(|s| s.name()))
            .finish()
    }
}

/// The declarative subset of [`CacheOptions`], loadable from JSON.
///
/// Function-valued settings and the storage handle cannot be expressed here;
/// set them on the [`CacheOptions`] this converts into.
///
/// ```rust
/// use response_cache::cache::CacheSettings;
///
/// let settings = CacheSettings::from_json(
///     r#"{ "namespace": "api", "ttlSeconds": 60, "cacheableStatusCodes": [200, 203] }"#,
/// ).unwrap();
/// assert_eq!(settings.ttl_seconds, Some(60));
/// assert!(!settings.bypass_method_check);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheSettings {
    pub namespace: String,
    pub ttl_seconds: Option<u64>,
    pub cacheable_status_codes: Vec<u16>,
    pub bypass_method_check: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_owned(),
            ttl_seconds: None,
            cacheable_status_codes: vec![200],
            bypass_method_check: false,
        }
    }
}

impl CacheSettings {
    /// Parses settings from a JSON document; absent fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl From<CacheSettings> for CacheOptions {
    fn from(settings: CacheSettings) -> Self {
        let options = CacheOptions::new()
            .namespace(settings.namespace)
            .cacheable_status_codes(settings.cacheable_status_codes)
            .bypass_method_check(settings.bypass_method_check);
        match settings.ttl_seconds {
            Some(seconds) => options.ttl_seconds(seconds),
            None => options,
        }
    }
}
