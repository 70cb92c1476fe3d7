//! # Group models shared by the store and the API layer
//!
//! [`Group`] mirrors a row of the remote `groups` collection and is what the
//! merge-and-order logic in [`crate::order`] works on. [`GroupMember`] mirrors a
//! row of `group_members`, the many-to-many relation between users and groups.
//! Both are read-only from the client's point of view: they are created and
//! changed only through remote calls.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A group as returned by the backend.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub title: String,
    /// Public URL of the cover image, if one was uploaded.
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_public: bool,
    /// Maintained by the backend; the client never recomputes it.
    #[serde(default)]
    pub member_count: i64,
    pub created_at: DateTime<Utc>,
    pub creator_id: String,
}

/// A membership row linking a user to a group.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroupMember {
    pub group_id: String,
    pub user_id: String,
    #[serde(default)]
    pub joined_at: Option<DateTime<Utc>>,
}
