//! tidecache core: response cache store, key derivation, and middleware.
//!
//! The store holds opaque payload blobs with per-entry TTLs, an optional
//! stale-while-revalidate window, exact tag invalidation, and LRU eviction
//! under a fixed capacity. The middleware decorates axum handlers, serving
//! hits with freshness headers and writing successful JSON responses back.
//!
//! ## Configuration
//!
//! Store limits and the middleware switch come from `Settings` (see
//! [`crate::config`]):
//!
//! ```toml
//! [cache]
//! enabled = true
//! capacity = 200
//! default_ttl_secs = 60
//! max_body_bytes = 1048576
//! ```

mod keys;
mod lock;
mod manager;
mod middleware;
mod policy;
mod store;

pub use keys::{CacheKey, derive_key};
pub use manager::CacheManager;
pub use middleware::{CacheState, response_cache_layer};
pub use policy::CachePolicy;
pub use store::{
    CacheEntry, CacheStats, CacheStore, EntryStats, Lookup, ReadOptions, WriteOptions,
};

pub(crate) use store::{
    METRIC_EVICT_TOTAL, METRIC_EXPIRED_TOTAL, METRIC_HIT_TOTAL, METRIC_INVALIDATED_TOTAL,
    METRIC_MISS_TOTAL, METRIC_STALE_HIT_TOTAL,
};
