//! Group invalidation across both tiers

use std::sync::Arc;

use tracing::{debug, warn};

use super::broadcast::GroupPublisher;
use super::group_index::GroupIndex;
use crate::domain::cache::Cache;
use crate::infrastructure::observability::{record_cache_invalidation, record_l2_error};

/// Drops every key this process tracked for a group from both tiers
#[derive(Debug)]
pub struct Invalidator {
    l1: Arc<dyn Cache>,
    l2: Arc<dyn Cache>,
    index: Arc<GroupIndex>,
    publisher: Option<Arc<dyn GroupPublisher>>,
}

impl Invalidator {
    pub fn new(l1: Arc<dyn Cache>, l2: Arc<dyn Cache>, index: Arc<GroupIndex>) -> Self {
        Self {
            l1,
            l2,
            index,
            publisher: None,
        }
    }

    /// Also announce each invalidated group to other instances
    pub fn with_publisher(mut self, publisher: Arc<dyn GroupPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// Invalidates locally, then broadcasts the group when a publisher is set.
    /// Returns the number of tracked keys that were dropped.
    pub async fn invalidate(&self, group: &str) -> usize {
        let removed = self.invalidate_local(group).await;

        if let Some(publisher) = &self.publisher {
            if let Err(e) = publisher.publish(group).await {
                warn!(group = %group, error = %e, "Failed to broadcast group invalidation");
                record_l2_error("publish");
            }
        }

        removed
    }

    /// Invalidates without broadcasting. Tier failures are logged and skipped.
    ///
    /// The group's keys leave the index before any delete is awaited, so a
    /// key populated while the deletes run stays tracked for the next write.
    pub async fn invalidate_local(&self, group: &str) -> usize {
        let keys = self.index.take(group);

        if keys.is_empty() {
            return 0;
        }

        for key in &keys {
            if let Err(e) = self.l1.delete(key).await {
                warn!(key = %key, error = %e, "Failed to drop key from local tier");
            }

            if let Err(e) = self.l2.delete(key).await {
                warn!(key = %key, error = %e, "Failed to drop key from shared tier");
                record_l2_error("delete");
            }
        }

        record_cache_invalidation(group, keys.len());
        debug!(group = %group, keys = keys.len(), "Invalidated cache group");

        keys.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::{CacheExt, MockCache};
    use crate::infrastructure::cache::broadcast::mock::RecordingPublisher;
    use crate::infrastructure::cache::InMemoryCache;
    use crate::domain::DomainError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    /// Shared tier that, on its first delete, behaves like a concurrent read
    /// populating `users:list:page=9` while the invalidation is in progress
    #[derive(Debug)]
    struct RacingTier {
        inner: InMemoryCache,
        index: Arc<GroupIndex>,
        raced: AtomicBool,
    }

    #[async_trait]
    impl Cache for RacingTier {
        async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError> {
            self.inner.get_raw(key).await
        }

        async fn set_raw(
            &self,
            key: &str,
            value: &str,
            ttl: Option<Duration>,
        ) -> Result<(), DomainError> {
            self.inner.set_raw(key, value, ttl).await
        }

        async fn delete(&self, key: &str) -> Result<bool, DomainError> {
            if !self.raced.swap(true, Ordering::SeqCst) {
                self.inner.set_raw("users:list:page=9", "[]", None).await?;
                self.index.track("users", "users:list:page=9");
            }

            self.inner.delete(key).await
        }

        async fn ttl(&self, key: &str) -> Result<Option<Duration>, DomainError> {
            self.inner.ttl(key).await
        }

        async fn clear(&self) -> Result<(), DomainError> {
            self.inner.clear().await
        }

        async fn size(&self) -> Result<usize, DomainError> {
            self.inner.size().await
        }
    }

    struct Fixture {
        l1: Arc<InMemoryCache>,
        l2: Arc<MockCache>,
        index: Arc<GroupIndex>,
        invalidator: Invalidator,
    }

    fn fixture() -> Fixture {
        let l1 = Arc::new(InMemoryCache::new());
        let l2 = Arc::new(MockCache::new());
        let index = Arc::new(GroupIndex::new());
        let invalidator = Invalidator::new(l1.clone(), l2.clone(), index.clone());

        Fixture {
            l1,
            l2,
            index,
            invalidator,
        }
    }

    async fn seed(f: &Fixture, key: &str) {
        f.l1.set(key, &"v", None).await.unwrap();
        f.l2.set(key, &"v", None).await.unwrap();
        f.index.track(crate::domain::cache::group_of(key), key);
    }

    #[tokio::test]
    async fn test_invalidate_drops_both_tiers() {
        let f = fixture();
        seed(&f, "users:list:").await;
        seed(&f, "users:42").await;
        seed(&f, "teams:list:").await;

        let removed = f.invalidator.invalidate("users").await;

        assert_eq!(removed, 2);
        assert!(!f.l1.exists("users:list:").await.unwrap());
        assert!(!f.l2.exists("users:42").await.unwrap());
        assert!(f.l1.exists("teams:list:").await.unwrap());
        assert!(f.index.keys_of("users").is_empty());
    }

    #[tokio::test]
    async fn test_empty_group_is_noop() {
        let f = fixture();

        assert_eq!(f.invalidator.invalidate("ghost").await, 0);
        assert_eq!(f.l2.delete_calls(), 0);
    }

    #[tokio::test]
    async fn test_shared_tier_failure_still_clears_group() {
        let f = fixture();
        seed(&f, "users:list:").await;
        f.l2.set_error(Some("connection refused".to_string()));

        let removed = f.invalidator.invalidate("users").await;

        assert_eq!(removed, 1);
        assert_eq!(f.l2.delete_calls(), 1);
        assert!(!f.l1.exists("users:list:").await.unwrap());
        assert!(f.index.keys_of("users").is_empty());
    }

    #[tokio::test]
    async fn test_publishes_after_local_invalidation() {
        let f = fixture();
        let publisher = Arc::new(RecordingPublisher::default());
        let invalidator = Invalidator::new(f.l1.clone(), f.l2.clone(), f.index.clone())
            .with_publisher(publisher.clone());

        invalidator.invalidate("users").await;

        assert_eq!(publisher.published(), vec!["users".to_string()]);
    }

    #[tokio::test]
    async fn test_publish_failure_is_swallowed() {
        let f = fixture();
        seed(&f, "users:list:").await;
        let invalidator = Invalidator::new(f.l1.clone(), f.l2.clone(), f.index.clone())
            .with_publisher(Arc::new(RecordingPublisher::failing()));

        assert_eq!(invalidator.invalidate("users").await, 1);
    }

    #[tokio::test]
    async fn test_local_invalidation_does_not_publish() {
        let f = fixture();
        let publisher = Arc::new(RecordingPublisher::default());
        let invalidator = Invalidator::new(f.l1.clone(), f.l2.clone(), f.index.clone())
            .with_publisher(publisher.clone());

        invalidator.invalidate_local("users").await;

        assert!(publisher.published().is_empty());
    }

    #[tokio::test]
    async fn test_key_populated_during_invalidation_is_dropped_by_next_write() {
        let l1 = Arc::new(InMemoryCache::new());
        let index = Arc::new(GroupIndex::new());
        let l2 = Arc::new(RacingTier {
            inner: InMemoryCache::new(),
            index: index.clone(),
            raced: AtomicBool::new(false),
        });
        let invalidator = Invalidator::new(l1.clone(), l2.clone(), index.clone());

        l2.set_raw("users:list:page=1", "[]", None).await.unwrap();
        index.track("users", "users:list:page=1");

        assert_eq!(invalidator.invalidate("users").await, 1);
        assert!(!l2.exists("users:list:page=1").await.unwrap());
        assert!(l2.exists("users:list:page=9").await.unwrap());
        assert!(index.keys_of("users").contains("users:list:page=9"));

        assert_eq!(invalidator.invalidate("users").await, 1);
        assert!(!l2.exists("users:list:page=9").await.unwrap());
        assert!(index.keys_of("users").is_empty());
    }
}
