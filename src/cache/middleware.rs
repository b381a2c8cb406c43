//! The cache-aside middleware.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::background::TaskQueue;
use crate::context::Context;
use crate::middleware::{Middleware, Next};
use crate::{Request, Response};

use super::codec;
use super::key::{self, KeySource};
use super::manager::CacheManager;
use super::options::CacheOptions;
use super::policy::AdmissionPolicy;
use super::storage::MemoryStorage;

/// Serves repeated requests from storage instead of running the handler.
///
/// For each request:
///
/// 1. Derive `"<namespace>:<key>"`.
/// 2. Look it up. On a hit, return the stored response; nothing downstream runs.
/// 3. On a miss, run the rest of the chain.
/// 4. If the [`AdmissionPolicy`] rejects the response, return it as-is.
/// 5. Otherwise capture it and write it back. If the request context carries a
///    [`TaskQueue`], the write is spawned there and the response is returned
///    without waiting; otherwise the write is awaited first.
///
/// Caching failures never change the response. Concurrent misses on one key
/// each run the handler and each write; the last write wins.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use response_cache::{Response, StatusCode};
/// use response_cache::cache::{CacheMiddleware, CacheOptions};
/// use response_cache::middleware::Pipeline;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let cache = Arc::new(CacheMiddleware::new(CacheOptions::new().namespace("n")));
/// let pipeline = Pipeline::new()
///     .layer(cache.clone())
///     .handler(|_ctx| async { Response::new(StatusCode::Ok).body(r#"{"count":1}"#) });
///
/// let raw = b"GET /x HTTP/1.1\r\nHost: localhost\r\n\r\n";
/// let (request, _) = response_cache::Request::parse(raw).unwrap();
/// pipeline.dispatch(request).await;
///
/// assert!(cache.manager().has("n:GET:http://localhost/x").await);
/// # }
/// ```
pub struct CacheMiddleware {
    inner: Arc<Inner>,
}

struct Inner {
    namespace: KeySource,
    key_fn: Option<KeySource>,
    policy: AdmissionPolicy,
    manager: Arc<CacheManager>,
}

impl CacheMiddleware {
    /// Builds the middleware. Without a configured backend, a private
    /// [`MemoryStorage`] is created and a warning is logged.
    pub fn new(options: CacheOptions) -> Self {
        let storage = options.storage.unwrap_or_else(|| {
            warn!("no cache storage configured, falling back to ephemeral in-memory storage");
            Arc::new(MemoryStorage::new())
        });

        let inner = Inner {
            namespace: options.namespace,
            key_fn: options.key_fn,
            policy: AdmissionPolicy::new(
                options.cacheable_status_codes,
                options.bypass_method_check,
            ),
            manager: Arc::new(CacheManager::new(storage, options.ttl)),
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    /// The manager backing this middleware, for inspection and invalidation.
    pub fn manager(&self) -> &CacheManager {
        &self.inner.manager
    }

    /// The full storage key `request` maps to.
    pub async fn key_for(&self, request: &Request) -> String {
        self.inner.key_for(request).await
    }
}

impl Inner {
    async fn key_for(&self, request: &Request) -> String {
        let namespace = self.namespace.resolve(request).await;
        let key = key::derive(request, self.key_fn.as_ref()).await;
        key::compose(&namespace, &key)
    }

    async fn serve(&self, ctx: Context, next: Next) -> Response {
        let key = self.key_for(ctx.request()).await;

        if let Some(entry) = self.manager.get(&key).await {
            match codec::deserialize(entry) {
                Ok(response) => {
                    debug!(key = %key, "cache hit");
                    return response;
                }
                Err(e) => warn!(key = %key, error = %e, "cached entry cannot be replayed, treating as miss"),
            }
        }
        debug!(key = %key, "cache miss");

        let method = ctx.request().method().clone();
        let after_response = ctx.extensions().get::<TaskQueue>().cloned();

        let response = next.run(ctx).await;

        if let Err(reason) = self.policy.check(&response, &method) {
            debug!(key = %key, ?reason, "response not admitted to cache");
            return response;
        }

        let entry = match codec::serialize(&response) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key = %key, error = %e, "response cannot be cached");
                return response;
            }
        };

        let manager = Arc::clone(&self.manager);
        match after_response {
            Some(queue) => queue.spawn(async move { manager.set(&key, &entry).await }),
            None => manager.set(&key, &entry).await,
        }

        response
    }
}

impl Middleware for CacheMiddleware {
    fn handle(&self, ctx: Context, next: Next) -> Pin<Box<dyn Future<Output = Response> + Send>> {
        let inner = Arc::clone(&self.inner);
        Box::pin(async move { inner.serve(ctx, next).await })
    }
}
