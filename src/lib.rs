//! # response-cache
//!
//! Cache-aside response caching middleware for async HTTP handlers.
//!
//! A [`CacheMiddleware`](cache::CacheMiddleware) derives a key for each request,
//! replays a stored response on a hit, and on a miss runs the handler and
//! writes admissible responses back, in the background when the host offers a
//! [`TaskQueue`](background::TaskQueue).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use response_cache::{Request, Response, StatusCode};
//! use response_cache::background::TaskQueue;
//! use response_cache::cache::{CacheMiddleware, CacheOptions};
//! use response_cache::middleware::Pipeline;
//!
//! #[tokio::main]
//! async fn main() {
//!     let background = TaskQueue::new();
//!     let pipeline = Pipeline::new()
//!         .layer(Arc::new(CacheMiddleware::new(
//!             CacheOptions::new().namespace("api").ttl_seconds(60),
//!         )))
//!         .background(background.clone())
//!         .handler(|_ctx| async {
//!             Response::new(StatusCode::Ok)
//!                 .header("Content-Type", "application/json")
//!                 .body(r#"{"count":1}"#)
//!         });
//!
//!     let (request, _) = Request::parse(b"GET /x HTTP/1.1\r\nHost: localhost\r\n\r\n").unwrap();
//!     let response = pipeline.dispatch(request).await;
//!     assert_eq!(response.status(), StatusCode::Ok);
//!
//!     background.drain().await;
//! }
//! ```

// ── Cache layer ──────────────────────────────────────────────────────────────
pub mod cache;

// ── Host primitives the cache plugs into ─────────────────────────────────────
pub mod background;
pub mod context;
pub mod http;
pub mod middleware;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use http::{Headers, Method, Request, Response, StatusCode};
