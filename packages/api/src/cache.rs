//! # Shared group cache
//!
//! Several screens show the signed-in user's groups. [`GroupCache`] keeps one
//! copy per user for a short TTL so that navigating between them does not
//! re-run the created/joined queries every time.
//!
//! The per-cache lock is held across the fetch, so concurrent callers for a
//! cold entry wait for the first fetch and then read its result instead of
//! issuing their own. Failed fetches are never cached. Writers call
//! [`invalidate`](GroupCache::invalidate) after creating, joining or leaving a
//! group.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use store::Group;
use tokio::sync::Mutex;

use crate::backend::Backend;
use crate::error::ApiError;
use crate::homee::HomeeApi;

#[derive(Clone, Debug)]
struct Entry {
    groups: Vec<Group>,
    fetched_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct GroupCache {
    ttl: Duration,
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl GroupCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// An entry stamped in the future (clock moved back) is stale.
    fn is_fresh(&self, entry: &Entry, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(entry.fetched_at);
        age.to_std().map(|age| age < self.ttl).unwrap_or(false)
    }

    /// Groups for `user_id`, served from cache while fresh.
    pub async fn groups_for_user<B: Backend>(
        &self,
        api: &HomeeApi<B>,
        user_id: &str,
    ) -> Result<Vec<Group>, ApiError> {
        let mut entries = self.entries.lock().await;
        if let Some(entry) = entries.get(user_id) {
            if self.is_fresh(entry, Utc::now()) {
                tracing::debug!("Group cache hit for {}", user_id);
                return Ok(entry.groups.clone());
            }
        }

        let groups = api.groups_for_user(user_id).await?;
        entries.insert(
            user_id.to_string(),
            Entry {
                groups: groups.clone(),
                fetched_at: Utc::now(),
            },
        );
        Ok(groups)
    }

    pub async fn invalidate(&self, user_id: &str) {
        self.entries.lock().await.remove(user_id);
    }

    pub async fn invalidate_all(&self) {
        self.entries.lock().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::homee::tests::{api, group_row};

    #[tokio::test]
    async fn test_second_read_is_served_from_cache() {
        let (backend, api) = api();
        backend.seed("groups", &[group_row("g1", "me", 1)]).unwrap();
        let cache = GroupCache::new(Duration::from_secs(60));

        let first = cache.groups_for_user(&api, "me").await.unwrap();
        let selects = backend.calls().select;
        let second = cache.groups_for_user(&api, "me").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(backend.calls().select, selects);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_fetch() {
        let (backend, api) = api();
        backend.seed("groups", &[group_row("g1", "me", 1)]).unwrap();
        let cache = GroupCache::new(Duration::from_secs(60));

        let (a, b) = tokio::join!(
            cache.groups_for_user(&api, "me"),
            cache.groups_for_user(&api, "me")
        );
        assert_eq!(a.unwrap(), b.unwrap());
        // created + memberships for a single fetch
        assert_eq!(backend.calls().select, 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let (backend, api) = api();
        let cache = GroupCache::new(Duration::from_secs(60));
        assert!(cache.groups_for_user(&api, "me").await.unwrap().is_empty());

        backend.seed("groups", &[group_row("g1", "me", 1)]).unwrap();
        assert!(cache.groups_for_user(&api, "me").await.unwrap().is_empty());

        cache.invalidate("me").await;
        assert_eq!(cache.groups_for_user(&api, "me").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_zero_ttl_always_refetches() {
        let (backend, api) = api();
        let cache = GroupCache::new(Duration::ZERO);
        cache.groups_for_user(&api, "me").await.unwrap();
        cache.groups_for_user(&api, "me").await.unwrap();
        assert_eq!(backend.calls().select, 4);
    }

    #[test]
    fn test_entry_from_the_future_is_stale() {
        let cache = GroupCache::new(Duration::from_secs(60));
        let now = Utc::now();
        let entry = |fetched_at| Entry {
            groups: Vec::new(),
            fetched_at,
        };

        assert!(cache.is_fresh(&entry(now - chrono::Duration::seconds(10)), now));
        assert!(!cache.is_fresh(&entry(now - chrono::Duration::seconds(61)), now));
        assert!(!cache.is_fresh(&entry(now + chrono::Duration::seconds(10)), now));
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let (backend, api) = api();
        let cache = GroupCache::new(Duration::from_secs(60));
        backend.fail_table("groups");
        assert!(cache.groups_for_user(&api, "me").await.is_err());

        backend.heal_table("groups");
        assert!(cache.groups_for_user(&api, "me").await.is_ok());

        cache.invalidate_all().await;
        assert!(cache.groups_for_user(&api, "me").await.is_ok());
    }
}
