//! Cache key derivation.
//!
//! A final key is `"<namespace>:<key>"`, where the key defaults to
//! `"<METHOD>:<full URL>"`. Neither part is escaped, so callers choosing custom
//! namespaces or key functions must keep the combinations unambiguous. Both
//! must also be deterministic for logically identical requests, or the cache
//! silently fragments.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::Request;

use super::storage::BoxFuture;

type SyncFn = Arc<dyn Fn(&Request) -> String + Send + Sync>;
type AsyncFn = Arc<dyn Fn(&Request) -> BoxFuture<'static, String> + Send + Sync>;

/// Produces a string from a request, either directly or asynchronously.
///
/// Used for both the namespace and the custom key function. Every variant is
/// resolved through the same `async` call, so callers have one suspend point
/// regardless of how the string is computed.
///
/// # Examples
///
/// ```
/// use response_cache::cache::KeySource;
/// use response_cache::Request;
///
/// let fixed = KeySource::from("api");
/// let by_path = KeySource::from_fn(|req: &Request| req.path().to_owned());
/// let by_tenant = KeySource::from_async_fn(|req: &Request| {
///     let tenant = req.headers().get("x-tenant").unwrap_or("public").to_owned();
///     async move { format!("tenant-{tenant}") }
/// });
/// # let _ = (fixed, by_path, by_tenant);
/// ```
#[derive(Clone)]
pub enum KeySource {
    Fixed(String),
    Sync(SyncFn),
    Async(AsyncFn),
}

impl KeySource {
    /// Wraps a synchronous function of the request.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&Request) -> String + Send + Sync + 'static,
    {
        Self::Sync(Arc::new(f))
    }

    /// Wraps a function returning a future. The future may not borrow the
    /// request; copy what it needs before the `async` block.
    pub fn from_async_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(&Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = String> + Send + 'static,
    {
        Self::Async(Arc::new(move |req: &Request| -> BoxFuture<'static, String> {
            Box::pin(f(req))
        }))
    }

    /// Produces the string for `request`.
    pub async fn resolve(&self, request: &Request) -> String {
        match self {
            Self::Fixed(value) => value.clone(),
            Self::Sync(f) => f(request),
            Self::Async(f) => f(request).await,
        }
    }
}

impl From<&str> for KeySource {
    fn from(value: &str) -> Self {
        Self::Fixed(value.to_owned())
    }
}

impl From<String> for KeySource {
    fn from(value: String) -> Self {
        Self::Fixed(value)
    }
}

impl fmt::Debug for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(value) => f.debug_tuple("Fixed").field(value).finish(),
            Self::Sync(_) => f.write_str("Sync(..)"),
            Self::Async(_) => f.write_str("Async(..)"),
        }
    }
}

/// `"<METHOD>:<full URL>"`, with the method exactly as received.
pub fn default_key(request: &Request) -> String {
    format!("{}:{}", request.method().as_str(), request.url())
}

/// The key for `request`: the custom source's output verbatim if given,
/// otherwise [`default_key`].
pub async fn derive(request: &Request, key_fn: Option<&KeySource>) -> String {
    match key_fn {
        Some(source) => source.resolve(request).await,
        None => default_key(request),
    }
}

/// Joins a namespace and a derived key.
pub fn compose(namespace: &str, key: &str) -> String {
    format!("{namespace}:{key}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_request(method: &str, target: &str) -> Request {
        let raw = format!("{method} {target} HTTP/1.1\r\nHost: localhost\r\n\r\n");
        let (req, _) = Request::parse(raw.as_bytes()).unwrap();
        req
    }

    #[tokio::test]
    async fn default_key_uses_method_and_full_url() {
        let req = make_request("GET", "/x?a=1");
        assert_eq!(derive(&req, None).await, "GET:http://localhost/x?a=1");
    }

    #[tokio::test]
    async fn identical_requests_share_a_key() {
        let a = derive(&make_request("GET", "/items?page=2"), None).await;
        let b = derive(&make_request("GET", "/items?page=2"), None).await;
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn method_and_url_distinguish_keys() {
        let get = derive(&make_request("GET", "/items"), None).await;
        let post = derive(&make_request("POST", "/items"), None).await;
        let other = derive(&make_request("GET", "/items?page=2"), None).await;
        assert_ne!(get, post);
        assert_ne!(get, other);
    }

    #[tokio::test]
    async fn sync_and_async_sources_resolve() {
        let req = make_request("GET", "/p?a=1");

        let path_only = KeySource::from_fn(|req: &Request| req.path().to_owned());
        assert_eq!(derive(&req, Some(&path_only)).await, "/p");

        let delayed = KeySource::from_async_fn(|req: &Request| {
            let path = req.path().to_owned();
            async move {
                tokio::task::yield_now().await;
                format!("async{path}")
            }
        });
        assert_eq!(delayed.resolve(&req).await, "async/p");

        assert_eq!(KeySource::from("ns").resolve(&req).await, "ns");
    }

    #[test]
    fn compose_joins_with_colon() {
        assert_eq!(compose("n", "GET:http://localhost/x"), "n:GET:http://localhost/x");
    }
}
