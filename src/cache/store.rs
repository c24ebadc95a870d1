//! Bounded response cache storage.
//!
//! Holds at most `capacity` entries behind a single lock, answers
//! freshness-aware lookups (fresh / stale-within-grace / expired), and
//! supports exact tag-based invalidation via a `tag -> key set` index.

use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use bytes::Bytes;
use lru::LruCache;
use metrics::counter;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::debug;

use super::keys::CacheKey;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

/// Truncation length for payload fingerprints (base64 of SHA-256).
const FINGERPRINT_LEN: usize = 16;

pub(crate) const METRIC_HIT_TOTAL: &str = "tidecache_hit_total";
pub(crate) const METRIC_STALE_HIT_TOTAL: &str = "tidecache_stale_hit_total";
pub(crate) const METRIC_MISS_TOTAL: &str = "tidecache_miss_total";
pub(crate) const METRIC_EVICT_TOTAL: &str = "tidecache_evict_total";
pub(crate) const METRIC_EXPIRED_TOTAL: &str = "tidecache_expired_total";
pub(crate) const METRIC_INVALIDATED_TOTAL: &str = "tidecache_invalidated_total";

/// One cached response payload with its freshness metadata.
///
/// Entries are replaced wholesale on re-caching, never mutated in place.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    payload: Bytes,
    stored_at: Instant,
    fresh_for: Duration,
    fingerprint: String,
    tags: Vec<String>,
    // Captured for diagnostics only; key derivation already encodes vary values.
    vary_context: HashMap<String, String>,
}

impl CacheEntry {
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Truncated base64 SHA-256 digest of the payload, computed at write time.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// TTL recorded when the entry was written.
    pub fn fresh_for(&self) -> Duration {
        self.fresh_for
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn vary_context(&self) -> &HashMap<String, String> {
        &self.vary_context
    }
}

/// Freshness parameters for a lookup. TTL itself is fixed at write time and
/// is never overridden by readers.
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    /// Window after expiry during which the entry may still be served.
    pub stale_grace: Option<Duration>,
    /// Stale serving must be opted into even when a grace window is set.
    pub serve_stale: bool,
}

/// Parameters for a write.
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    /// TTL for the new entry; falls back to the store default when `None`.
    pub ttl: Option<Duration>,
    /// Tags the entry can later be invalidated by.
    pub tags: Vec<String>,
    /// Vary-header values captured at write time (diagnostics only).
    pub vary_context: HashMap<String, String>,
}

/// Outcome of a freshness-aware lookup.
#[derive(Debug, Clone)]
pub enum Lookup {
    /// Entry age is within its TTL.
    Fresh(CacheEntry),
    /// Entry is past its TTL but within the caller's stale grace window.
    Stale(CacheEntry),
    /// No entry, or the entry was expired and has been purged.
    Miss,
}

impl Lookup {
    pub fn entry(&self) -> Option<&CacheEntry> {
        match self {
            Self::Fresh(entry) | Self::Stale(entry) => Some(entry),
            Self::Miss => None,
        }
    }

    pub fn is_miss(&self) -> bool {
        matches!(self, Self::Miss)
    }
}

enum Outcome {
    Absent,
    Expired,
    Hit { entry: CacheEntry, stale: bool },
}

struct Inner {
    entries: LruCache<CacheKey, CacheEntry>,
    tags: HashMap<String, HashSet<CacheKey>>,
}

impl Inner {
    fn deindex(&mut self, key: &CacheKey, tags: &[String], skip: Option<&str>) {
        for tag in tags {
            if skip.is_some_and(|skipped| skipped == tag.as_str()) {
                continue;
            }
            let emptied = self
                .tags
                .get_mut(tag.as_str())
                .map(|keys| {
                    keys.remove(key);
                    keys.is_empty()
                })
                .unwrap_or(false);
            if emptied {
                self.tags.remove(tag.as_str());
            }
        }
    }
}

/// In-memory response cache with LRU eviction under a fixed capacity.
///
/// One store is constructed per process at startup and shared via `Arc`
/// between the middleware and the admin surface.
pub struct CacheStore {
    inner: RwLock<Inner>,
    capacity: NonZeroUsize,
    default_ttl: Duration,
}

impl CacheStore {
    pub fn new(capacity: NonZeroUsize, default_ttl: Duration) -> Self {
        Self {
            inner: RwLock::new(Inner {
                entries: LruCache::new(capacity),
                tags: HashMap::new(),
            }),
            capacity,
            default_ttl,
        }
    }

    /// Look up `key`, enforcing freshness against the entry's own TTL.
    ///
    /// Expired entries are purged on the spot. Any hit refreshes the entry's
    /// recency position so capacity eviction removes the least-recently
    /// touched survivor.
    pub fn get(&self, key: &CacheKey, options: &ReadOptions) -> Lookup {
        let now = Instant::now();
        let mut inner = rw_write(&self.inner, SOURCE, "get");

        let outcome = match inner.entries.get(key) {
            None => Outcome::Absent,
            Some(entry) => {
                let age = now.saturating_duration_since(entry.stored_at);
                if age < entry.fresh_for {
                    Outcome::Hit {
                        entry: entry.clone(),
                        stale: false,
                    }
                } else if options.serve_stale
                    && options
                        .stale_grace
                        .is_some_and(|grace| age < entry.fresh_for + grace)
                {
                    Outcome::Hit {
                        entry: entry.clone(),
                        stale: true,
                    }
                } else {
                    Outcome::Expired
                }
            }
        };

        match outcome {
            Outcome::Absent => {
                counter!(METRIC_MISS_TOTAL).increment(1);
                Lookup::Miss
            }
            Outcome::Expired => {
                if let Some(expired) = inner.entries.pop(key) {
                    inner.deindex(key, &expired.tags, None);
                    debug!(key = %key, "purged expired entry");
                }
                counter!(METRIC_EXPIRED_TOTAL).increment(1);
                counter!(METRIC_MISS_TOTAL).increment(1);
                Lookup::Miss
            }
            Outcome::Hit { entry, stale } => {
                if stale {
                    counter!(METRIC_STALE_HIT_TOTAL).increment(1);
                    Lookup::Stale(entry)
                } else {
                    counter!(METRIC_HIT_TOTAL).increment(1);
                    Lookup::Fresh(entry)
                }
            }
        }
    }

    /// Insert or replace the entry at `key`.
    ///
    /// At capacity, exactly one entry (the least-recently touched) is evicted
    /// before the insert. Writes never fail.
    pub fn set(&self, key: CacheKey, payload: Bytes, options: WriteOptions) {
        let now = Instant::now();
        let tags = options.tags;
        let entry = CacheEntry {
            fingerprint: fingerprint(&payload),
            payload,
            stored_at: now,
            fresh_for: options.ttl.unwrap_or(self.default_ttl),
            tags: tags.clone(),
            vary_context: options.vary_context,
        };

        let mut inner = rw_write(&self.inner, SOURCE, "set");

        // Re-caching replaces the previous entry without counting as eviction.
        if let Some(previous) = inner.entries.pop(&key) {
            inner.deindex(&key, &previous.tags, None);
        }

        let ttl_secs = entry.fresh_for.as_secs();
        let bytes = entry.payload.len();
        if let Some((evicted_key, evicted)) = inner.entries.push(key.clone(), entry) {
            inner.deindex(&evicted_key, &evicted.tags, None);
            counter!(METRIC_EVICT_TOTAL).increment(1);
            debug!(evicted = %evicted_key, "evicted least-recently touched entry");
        }
        for tag in tags {
            inner.tags.entry(tag).or_default().insert(key.clone());
        }
        debug!(key = %key, ttl_secs, bytes, "cached response payload");
    }

    /// Remove every entry declared with `tag`; returns the number removed.
    ///
    /// Matching is exact against declared tags, not against key contents.
    pub fn invalidate_tag(&self, tag: &str) -> usize {
        let mut inner = rw_write(&self.inner, SOURCE, "invalidate_tag");
        let Some(keys) = inner.tags.remove(tag) else {
            return 0;
        };

        let mut removed = 0;
        for key in keys {
            if let Some(entry) = inner.entries.pop(&key) {
                inner.deindex(&key, &entry.tags, Some(tag));
                removed += 1;
            }
        }
        counter!(METRIC_INVALIDATED_TOTAL).increment(removed as u64);
        debug!(tag, removed, "invalidated tagged entries");
        removed
    }

    /// Remove all entries unconditionally.
    pub fn clear(&self) {
        let mut inner = rw_write(&self.inner, SOURCE, "clear");
        let dropped = inner.entries.len();
        inner.entries.clear();
        inner.tags.clear();
        debug!(dropped, "cleared cache");
    }

    /// Introspection snapshot; no side effects.
    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let inner = rw_read(&self.inner, SOURCE, "stats");
        let entries = inner
            .entries
            .iter()
            .map(|(key, entry)| EntryStats {
                key: key.to_string(),
                age_seconds: now.saturating_duration_since(entry.stored_at).as_secs(),
                approximate_bytes: key.as_str().len() + entry.payload.len(),
            })
            .collect();
        CacheStats {
            size: inner.entries.len(),
            capacity: self.capacity.get(),
            entries,
        }
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        rw_read(&self.inner, SOURCE, "len").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Snapshot of store contents for the admin surface.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub capacity: usize,
    pub entries: Vec<EntryStats>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EntryStats {
    pub key: String,
    pub age_seconds: u64,
    pub approximate_bytes: usize,
}

/// Truncated URL-safe base64 of the payload's SHA-256 digest. Deterministic
/// for byte-identical payloads; used as the weak ETag validator.
fn fingerprint(payload: &Bytes) -> String {
    let digest = Sha256::digest(payload);
    let mut encoded = URL_SAFE_NO_PAD.encode(digest);
    encoded.truncate(FINGERPRINT_LEN);
    encoded
}
