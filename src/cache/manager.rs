//! Manual control surface over the store.

use std::sync::Arc;

use super::store::{CacheStats, CacheStore};

/// Administrative handle for targeted and full invalidation plus
/// introspection. Cheap to clone; every operation delegates to the shared
/// store.
#[derive(Clone)]
pub struct CacheManager {
    store: Arc<CacheStore>,
}

impl CacheManager {
    pub fn new(store: Arc<CacheStore>) -> Self {
        Self { store }
    }

    /// Remove every entry declared with `tag`; returns the number removed.
    pub fn invalidate_tag(&self, tag: &str) -> usize {
        self.store.invalidate_tag(tag)
    }

    /// Remove all entries unconditionally.
    pub fn clear(&self) {
        self.store.clear();
    }

    pub fn stats(&self) -> CacheStats {
        self.store.stats()
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;
    use std::time::Duration;

    use bytes::Bytes;

    use crate::cache::keys::CacheKey;
    use crate::cache::store::WriteOptions;

    use super::*;

    fn manager_with_entries() -> CacheManager {
        let store = Arc::new(CacheStore::new(
            NonZeroUsize::new(8).expect("capacity"),
            Duration::from_secs(60),
        ));
        store.set(
            CacheKey::from_raw("GET /trips"),
            Bytes::from_static(b"[]"),
            WriteOptions {
                tags: vec!["trips".to_string()],
                ..Default::default()
            },
        );
        CacheManager::new(store)
    }

    #[test]
    fn delegates_invalidation_and_stats() {
        let manager = manager_with_entries();
        assert_eq!(manager.stats().size, 1);
        assert_eq!(manager.invalidate_tag("trips"), 1);
        assert_eq!(manager.stats().size, 0);
    }

    #[test]
    fn clear_empties_the_store() {
        let manager = manager_with_entries();
        manager.clear();
        assert_eq!(manager.stats().size, 0);
    }
}
