//! Session data returned by the auth service.

use serde::{Deserialize, Serialize};

/// Storage key the session is mirrored under on the device.
pub const SESSION_KEY: &str = "homee.session";

/// A session this close to its expiry is refreshed before use.
pub const EXPIRY_MARGIN_SECS: i64 = 30;

/// The authenticated user as known to the auth service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Credentials issued after a successful OTP verification or refresh.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Absolute expiry of `access_token`, in unix seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    pub user: AuthUser,
}

impl Session {
    /// Fill `expires_at` from `expires_in` when the auth service sent only
    /// the relative lifetime.
    pub fn stamp_expiry(&mut self, now: i64) {
        if self.expires_at.is_none() {
            self.expires_at = self.expires_in.map(|secs| now + secs);
        }
    }

    /// A session without a known expiry is treated as valid.
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|at| at <= now + EXPIRY_MARGIN_SECS)
    }
}
