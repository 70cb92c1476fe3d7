//! # Browser `localStorage` store
//!
//! [`LocalStore`] is the [`KeyValueStore`] implementation used on the **web
//! platform**. It writes straight into `window.localStorage`, prefixing every key
//! so several users (or the app and other scripts on the same origin) do not
//! collide.
//!
//! | Namespace | Stored key for `featuredGroupIds` |
//! |-----------|-----------------------------------|
//! | `None` | `homee:featuredGroupIds` |
//! | `Some("user-uuid")` | `homee-user-uuid:featuredGroupIds` |
//!
//! Reads swallow errors and return `None` (private browsing, disabled storage);
//! writes surface them as [`StoreError::Unavailable`].

use crate::error::StoreError;
use crate::kv::KeyValueStore;

const DEFAULT_PREFIX: &str = "homee";

/// localStorage-backed KeyValueStore for the web platform.
#[derive(Clone, Debug)]
pub struct LocalStore {
    prefix: String,
}

impl Default for LocalStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalStore {
    /// Create an unscoped store using the default `"homee"` prefix.
    pub fn new() -> Self {
        Self::with_namespace(None)
    }

    /// Create a store scoped to an optional user namespace.
    pub fn with_namespace(namespace: Option<&str>) -> Self {
        let prefix = match namespace {
            Some(ns) => format!("{DEFAULT_PREFIX}-{ns}"),
            None => DEFAULT_PREFIX.to_string(),
        };
        Self { prefix }
    }

    fn scoped(&self, key: &str) -> String {
        format!("{}:{key}", self.prefix)
    }

    fn storage() -> Result<web_sys::Storage, StoreError> {
        let window =
            web_sys::window().ok_or_else(|| StoreError::Unavailable("no window".into()))?;
        window
            .local_storage()
            .map_err(|e| StoreError::Unavailable(format!("{e:?}")))?
            .ok_or_else(|| StoreError::Unavailable("localStorage disabled".into()))
    }
}

impl KeyValueStore for LocalStore {
    async fn get(&self, key: &str) -> Option<String> {
        let storage = Self::storage().ok()?;
        storage.get_item(&self.scoped(key)).ok().flatten()
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        Self::storage()?
            .set_item(&self.scoped(key), &value)
            .map_err(|e| StoreError::Unavailable(format!("{e:?}")))
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        Self::storage()?
            .remove_item(&self.scoped(key))
            .map_err(|e| StoreError::Unavailable(format!("{e:?}")))
    }
}
