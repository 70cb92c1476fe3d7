//! Data models for the remote collections.

mod album;
mod friend;
mod profile;
mod session;

pub use album::{Album, Image, NewAlbum, NewImage};
pub use friend::Friend;
pub use profile::{NewProfile, Profile, ProfileUpdate};
pub use session::{AuthUser, Session, SESSION_KEY};
pub use store::{Group, GroupMember};

use serde::Serialize;

/// Insert payload for the `groups` collection.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewGroup {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub is_public: bool,
    pub creator_id: String,
}

/// Insert payload for the `group_members` collection.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub(crate) struct NewGroupMember<'a> {
    pub group_id: &'a str,
    pub user_id: &'a str,
}
