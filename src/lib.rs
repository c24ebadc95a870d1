//! tidecache: in-process HTTP response caching for axum services.
//!
//! The crate is a pure request/response decorator: it wraps an idempotent
//! read handler, serves cached payloads with freshness headers, and writes
//! successful JSON responses back into a bounded in-memory store. Caching is
//! strictly best-effort; any failure in the caching path degrades to "cache
//! absent" and never alters what the wrapped handler returns.
//!
//! - [`cache::CacheStore`] holds entries with TTL freshness, an optional
//!   stale-while-revalidate window, tag-based invalidation, and LRU eviction
//!   under a fixed capacity.
//! - [`cache::response_cache_layer`] is the axum middleware that consults the
//!   store, annotating responses with `X-Cache`, `ETag`, and `Cache-Control`.
//! - [`cache::CachePolicy`] bundles per-route options (TTL, stale grace,
//!   tags, vary headers) with presets for common data-volatility classes.
//! - [`http::admin_router`] exposes the manual control surface (stats,
//!   invalidate-by-tag, clear) over HTTP.

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod telemetry;
