//! Bounded, approximately-LRU memoization of inspection results.
//!
//! Re-architected from the source's per-method `@lru_cache` decorator into
//! an explicit object: the key folds in coarse status so a status
//! transition (e.g. `Up` -> `Exited`) always misses, per spec.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use tokio::sync::Mutex;

use crate::node::model::InspectionRecord;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub node: String,
    pub container_id: String,
    pub coarse_status: String,
}

impl CacheKey {
    pub fn new(node: impl Into<String>, container_id: impl Into<String>, coarse_status: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            container_id: container_id.into(),
            coarse_status: coarse_status.into(),
        }
    }
}

/// Thread-safe bounded cache of inspection records.
pub struct InspectionCache {
    inner: Mutex<LruCache<CacheKey, Arc<InspectionRecord>>>,
}

impl InspectionCache {
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1024).unwrap());
        Self {
            inner: Mutex::new(LruCache::new(cap)),
        }
    }

    /// Return a cached record for `key` without issuing any remote call.
    pub async fn get(&self, key: &CacheKey) -> Option<Arc<InspectionRecord>> {
        self.inner.lock().await.get(key).cloned()
    }

    pub async fn insert(&self, key: CacheKey, record: Arc<InspectionRecord>) {
        self.inner.lock().await.put(key, record);
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::model::{ContainerConfig, ContainerState, InspectionRecord, NetworkSettings};

    fn fixture(id: &str) -> Arc<InspectionRecord> {
        Arc::new(InspectionRecord {
            id: id.to_string(),
            name: format!("/app_{id}"),
            config: ContainerConfig { env: vec![], cpu_shares: 1 },
            network_settings: NetworkSettings { ports: Default::default() },
            state: ContainerState { finished_at: "0001-01-01T00:00:00Z".into() },
        })
    }

    #[tokio::test]
    async fn hit_returns_without_recomputation() {
        let cache = InspectionCache::new(4);
        let key = CacheKey::new("node-1", "abc", "Up");
        assert!(cache.get(&key).await.is_none());
        cache.insert(key.clone(), fixture("abc")).await;
        let hit = cache.get(&key).await.unwrap();
        assert_eq!(hit.id, "abc");
    }

    #[tokio::test]
    async fn status_transition_misses() {
        let cache = InspectionCache::new(4);
        let up_key = CacheKey::new("node-1", "abc", "Up");
        cache.insert(up_key, fixture("abc")).await;
        let exited_key = CacheKey::new("node-1", "abc", "Exited");
        assert!(cache.get(&exited_key).await.is_none());
    }

    #[tokio::test]
    async fn evicts_least_recently_used_at_capacity() {
        let cache = InspectionCache::new(2);
        cache.insert(CacheKey::new("n", "a", "Up"), fixture("a")).await;
        cache.insert(CacheKey::new("n", "b", "Up"), fixture("b")).await;
        cache.insert(CacheKey::new("n", "c", "Up"), fixture("c")).await;
        assert!(cache.get(&CacheKey::new("n", "a", "Up")).await.is_none());
        assert!(cache.get(&CacheKey::new("n", "c", "Up")).await.is_some());
    }
}
