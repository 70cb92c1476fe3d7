use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A row of the `friends` collection: `user_id` follows `friend_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Friend {
    pub user_id: String,
    pub friend_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}
