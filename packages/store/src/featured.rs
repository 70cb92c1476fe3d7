//! # Featured groups: a small persisted selection of group ids
//!
//! [`FeaturedGroups`] keeps the user's hand-picked "featured" groups: an ordered
//! list of at most [`MAX_FEATURED_GROUPS`] group ids with no duplicates. The list
//! lives in memory and is mirrored into a [`KeyValueStore`] under
//! [`FEATURED_GROUP_IDS_KEY`] as a JSON array of strings.
//!
//! ## Lifecycle
//!
//! | Method | Effect |
//! |--------|--------|
//! | [`hydrate`](FeaturedGroups::hydrate) | Replace the in-memory list with what is persisted. Safe to call repeatedly. |
//! | [`set_featured_group_ids`](FeaturedGroups::set_featured_group_ids) | Keep the first five distinct ids, persist, replace. Extra ids are dropped silently. |
//! | [`add_featured_group`](FeaturedGroups::add_featured_group) | Append unless already present or already full. |
//! | [`remove_featured_group`](FeaturedGroups::remove_featured_group) | Filter the id out. |
//!
//! There is no change notification: a screen that wants to see edits made
//! elsewhere calls `hydrate` again. Hydration never looks at remote data; stale
//! ids (groups that were deleted or left) stay in storage and are skipped at
//! display time by [`crate::order::order_groups`].

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::StoreError;
use crate::kv::KeyValueStore;

/// Storage key holding the JSON-encoded featured id list.
pub const FEATURED_GROUP_IDS_KEY: &str = "featuredGroupIds";

/// Upper bound on the number of featured groups.
pub const MAX_FEATURED_GROUPS: usize = 5;

/// Featured group selection backed by a key-value store.
#[derive(Clone, Debug)]
pub struct FeaturedGroups<S: KeyValueStore> {
    store: S,
    ids: Arc<Mutex<Vec<String>>>,
}

impl<S: KeyValueStore> FeaturedGroups<S> {
    /// Create an empty, un-hydrated selection.
    pub fn new(store: S) -> Self {
        Self {
            store,
            ids: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// The current in-memory list.
    pub fn featured_group_ids(&self) -> Vec<String> {
        self.ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_featured(&self, id: &str) -> bool {
        self.ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|existing| existing == id)
    }

    pub fn is_full(&self) -> bool {
        self.ids.lock().unwrap_or_else(PoisonError::into_inner).len() >= MAX_FEATURED_GROUPS
    }

    /// Load the persisted list into memory and return it.
    ///
    /// Missing or unreadable data hydrates to an empty list.
    pub async fn hydrate(&self) -> Vec<String> {
        let ids = match self.store.get(FEATURED_GROUP_IDS_KEY).await {
            Some(raw) => match serde_json::from_str::<Vec<String>>(&raw) {
                Ok(ids) => normalize(ids),
                Err(e) => {
                    tracing::warn!("Ignoring unreadable featured group ids: {}", e);
                    Vec::new()
                }
            },
            None => Vec::new(),
        };
        self.replace(ids.clone());
        ids
    }

    /// Replace the selection with the first five distinct ids of `ids`.
    ///
    /// The in-memory list only changes once the new list has been persisted.
    pub async fn set_featured_group_ids<I, T>(&self, ids: I) -> Result<Vec<String>, StoreError>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let ids = normalize(ids.into_iter().map(Into::into));
        self.persist(&ids).await?;
        self.replace(ids.clone());
        Ok(ids)
    }

    /// Append `id`. Returns `false` without touching storage when the id is
    /// already featured or the list is full.
    pub async fn add_featured_group(&self, id: &str) -> Result<bool, StoreError> {
        let mut ids = self.featured_group_ids();
        if ids.len() >= MAX_FEATURED_GROUPS || ids.iter().any(|existing| existing == id) {
            return Ok(false);
        }
        ids.push(id.to_string());
        self.persist(&ids).await?;
        self.replace(ids);
        Ok(true)
    }

    /// Remove `id`. Returns whether it was present.
    pub async fn remove_featured_group(&self, id: &str) -> Result<bool, StoreError> {
        let mut ids = self.featured_group_ids();
        let before = ids.len();
        ids.retain(|existing| existing != id);
        let removed = ids.len() != before;
        self.persist(&ids).await?;
        self.replace(ids);
        Ok(removed)
    }

    async fn persist(&self, ids: &[String]) -> Result<(), StoreError> {
        let raw = serde_json::to_string(ids)?;
        self.store.set(FEATURED_GROUP_IDS_KEY, raw).await
    }

    fn replace(&self, ids: Vec<String>) {
        *self.ids.lock().unwrap_or_else(PoisonError::into_inner) = ids;
    }
}

/// Drop duplicates (first occurrence wins) and truncate to the cap.
fn normalize(ids: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.into_iter()
        .filter(|id| seen.insert(id.clone()))
        .take(MAX_FEATURED_GROUPS)
        .collect()
}
