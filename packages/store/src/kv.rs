//! # Key-value storage trait
//!
//! [`KeyValueStore`] is the seam between client state and whatever the platform
//! offers for small persisted values. Values are plain strings; callers encode
//! structured data as JSON before writing.
//!
//! | Implementation | Platform |
//! |----------------|----------|
//! | [`crate::MemoryStore`] | tests, fallback when nothing persistent is available |
//! | [`crate::FileStore`] | desktop and mobile (one file per key) |
//! | `LocalStore` | web, backed by `window.localStorage` (`web` feature) |
//!
//! Reads return `None` both for "never written" and "unreadable"; the client
//! treats either as an empty value. Writes report failures so callers can keep
//! their in-memory state consistent with what was actually persisted.

use crate::error::StoreError;

/// Async trait for persisting small string values under fixed keys.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> impl std::future::Future<Output = Option<String>>;
    fn set(
        &self,
        key: &str,
        value: String,
    ) -> impl std::future::Future<Output = Result<(), StoreError>>;
    fn remove(&self, key: &str) -> impl std::future::Future<Output = Result<(), StoreError>>;
}
