//! Per-route caching options and presets.

use std::collections::HashMap;
use std::time::Duration;

use super::store::{ReadOptions, WriteOptions};

const DEFAULT_TTL_SECS: u64 = 60;
const NEAR_STATIC_TTL_SECS: u64 = 3600;
const NEAR_STATIC_GRACE_SECS: u64 = 86400;
const PER_USER_TTL_SECS: u64 = 60;
const SEARCH_TTL_SECS: u64 = 300;
const SEARCH_GRACE_SECS: u64 = 600;

/// Option bundle attached to a cached route: TTL, stale-serving window,
/// invalidation tags, and the headers whose values partition the key space.
#[derive(Debug, Clone)]
pub struct CachePolicy {
    pub ttl: Duration,
    pub stale_grace: Option<Duration>,
    pub serve_stale: bool,
    pub tags: Vec<String>,
    pub vary_headers: Vec<String>,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(DEFAULT_TTL_SECS),
            stale_grace: None,
            serve_stale: false,
            tags: Vec::new(),
            vary_headers: Vec::new(),
        }
    }
}

impl CachePolicy {
    /// Long TTL with a long stale window, for data that rarely changes
    /// (trip catalogs, location pages).
    pub fn near_static() -> Self {
        Self {
            ttl: Duration::from_secs(NEAR_STATIC_TTL_SECS),
            stale_grace: Some(Duration::from_secs(NEAR_STATIC_GRACE_SECS)),
            serve_stale: true,
            ..Default::default()
        }
    }

    /// Short TTL keyed per caller, for per-user data.
    pub fn per_user() -> Self {
        Self {
            ttl: Duration::from_secs(PER_USER_TTL_SECS),
            vary_headers: vec!["authorization".to_string()],
            ..Default::default()
        }
    }

    /// Medium TTL with header vary, for search and availability results.
    pub fn search_results() -> Self {
        Self {
            ttl: Duration::from_secs(SEARCH_TTL_SECS),
            stale_grace: Some(Duration::from_secs(SEARCH_GRACE_SECS)),
            serve_stale: true,
            vary_headers: vec!["accept-language".to_string()],
            ..Default::default()
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_stale_grace(mut self, grace: Duration) -> Self {
        self.stale_grace = Some(grace);
        self.serve_stale = true;
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_vary_header(mut self, name: impl Into<String>) -> Self {
        self.vary_headers.push(name.into());
        self
    }

    pub(crate) fn read_options(&self) -> ReadOptions {
        ReadOptions {
            stale_grace: self.stale_grace,
            serve_stale: self.serve_stale,
        }
    }

    pub(crate) fn write_options(&self, vary_context: HashMap<String, String>) -> WriteOptions {
        WriteOptions {
            ttl: Some(self.ttl),
            tags: self.tags.clone(),
            vary_context,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn near_static_serves_stale() {
        let policy = CachePolicy::near_static();
        assert_eq!(policy.ttl, Duration::from_secs(3600));
        assert_eq!(policy.stale_grace, Some(Duration::from_secs(86400)));
        assert!(policy.serve_stale);
        assert!(policy.vary_headers.is_empty());
    }

    #[test]
    fn per_user_varies_on_authorization() {
        let policy = CachePolicy::per_user();
        assert_eq!(policy.ttl, Duration::from_secs(60));
        assert!(!policy.serve_stale);
        assert_eq!(policy.vary_headers, vec!["authorization".to_string()]);
    }

    #[test]
    fn builder_helpers_compose() {
        let policy = CachePolicy::default()
            .with_ttl(Duration::from_secs(5))
            .with_stale_grace(Duration::from_secs(10))
            .with_tag("trips")
            .with_vary_header("accept-language");

        assert_eq!(policy.ttl, Duration::from_secs(5));
        assert!(policy.serve_stale);
        assert_eq!(policy.tags, vec!["trips".to_string()]);

        let reads = policy.read_options();
        assert_eq!(reads.stale_grace, Some(Duration::from_secs(10)));
        assert!(reads.serve_stale);

        let writes = policy.write_options(HashMap::new());
        assert_eq!(writes.ttl, Some(Duration::from_secs(5)));
        assert_eq!(writes.tags, vec!["trips".to_string()]);
    }
}
