use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::StoreError;
use crate::kv::KeyValueStore;

/// In-memory KeyValueStore for testing and as a non-persistent fallback.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_remove() {
        let store = MemoryStore::new();
        assert!(store.get("missing").await.is_none());

        store.set("greeting", "hello".to_string()).await.unwrap();
        assert_eq!(store.get("greeting").await.as_deref(), Some("hello"));

        store.set("greeting", "hi".to_string()).await.unwrap();
        assert_eq!(store.get("greeting").await.as_deref(), Some("hi"));

        store.remove("greeting").await.unwrap();
        assert!(store.get("greeting").await.is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let store = MemoryStore::new();
        let other = store.clone();

        store.set("k", "v".to_string()).await.unwrap();
        assert_eq!(other.get("k").await.as_deref(), Some("v"));
        assert_eq!(other.len(), 1);
    }
}
