pub mod error;
pub mod featured;
pub mod kv;
pub mod models;
pub mod order;

mod file_store;
pub use file_store::FileStore;

mod memory;
pub use memory::MemoryStore;

#[cfg(all(target_arch = "wasm32", feature = "web"))]
mod local_store;
#[cfg(all(target_arch = "wasm32", feature = "web"))]
pub use local_store::LocalStore;

pub use error::StoreError;
pub use featured::{FeaturedGroups, FEATURED_GROUP_IDS_KEY, MAX_FEATURED_GROUPS};
pub use kv::KeyValueStore;
pub use models::{Group, GroupMember};
pub use order::{dedupe_groups, order_groups};
