//! Cache-aside response caching.
//!
//! [`CacheMiddleware`] sits in front of a handler and replays stored responses
//! for repeated requests. It is assembled from small pieces that can be used
//! on their own:
//!
//! | Component              | Role                                                  |
//! |------------------------|-------------------------------------------------------|
//! | [`key`]                | Derives `"<namespace>:<key>"` from a request          |
//! | [`AdmissionPolicy`]    | Decides whether a response may be stored              |
//! | [`codec`]              | Converts responses to and from [`CacheEntry`]         |
//! | [`CacheManager`]       | Storage access with lazy TTL expiry, fail-open        |
//! | [`Storage`]            | Backend contract; [`MemoryStorage`] is the default    |
//! | [`CacheOptions`]       | Per-middleware configuration                          |
//!
//! Caching is strictly additive: removing the middleware leaves request and
//! response semantics unchanged, and no error in this module reaches a client.
//!
//! ## Limitations
//!
//! - Only text bodies can be cached.
//! - Expired entries are removed only when read.
//! - No request coalescing: concurrent misses on one key all run the handler.

pub mod codec;
mod entry;
mod error;
pub mod key;
mod manager;
mod middleware;
mod options;
mod policy;
mod storage;

pub use entry::{CacheEntry, CacheMetadata, now_millis};
pub use error::{CacheError, CacheResult, StorageError};
pub use key::KeySource;
pub use manager::CacheManager;
pub use middleware::CacheMiddleware;
pub use options::{CacheOptions, CacheSettings, DEFAULT_NAMESPACE};
pub use policy::{AdmissionPolicy, Rejection};
pub use storage::{BoxFuture, MemoryStorage, Storage, StorageResult};
