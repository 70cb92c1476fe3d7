//! # User profile rows
//!
//! A profile is the app-level row in the `users` collection. Its `id` is the id
//! the auth service assigned when the email was first verified, so a verified
//! session with no matching row means registration was never completed.
//!
//! - [`Profile`]: full row as read back from the backend.
//! - [`NewProfile`]: insert payload written at the end of registration.
//! - [`ProfileUpdate`]: partial update; `None` fields are omitted from the
//!   request body and therefore left unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub id: String,
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub background_url: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Profile {
    /// Get display name, falling back to username if name is not set.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.username)
    }

    /// An empty avatar URL counts as no avatar.
    pub fn has_avatar(&self) -> bool {
        self.avatar_url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewProfile {
    pub id: String,
    pub email: String,
    pub username: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_url: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}
