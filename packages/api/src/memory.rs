//! # In-memory backend
//!
//! [`MemoryBackend`] implements [`Backend`] entirely in process memory. It is
//! what the test-suites run against, and it lets the app start without network
//! access during development.
//!
//! It reproduces the backend behaviour the client depends on:
//!
//! - OTP dispatch refuses unknown addresses when `create_user` is false and
//!   otherwise "emails" a fixed code (see [`MemoryBackend::with_otp_code`]).
//! - Verification accepts only the last code sent to that address and creates
//!   the auth user on first success.
//! - Sessions expire after an hour and carry a single-use refresh token. Row
//!   and blob calls made with an expired session refresh it first, and a
//!   revoked refresh token ends the session with
//!   [`ApiError::NotAuthenticated`]. [`MemoryBackend::expire_session`] and
//!   [`MemoryBackend::revoke_refresh_tokens`] drive those paths in tests.
//! - Inserted rows get an `id` and a `created_at` when the payload has none,
//!   the way column defaults would fill them.
//! - Tables and upload paths can be switched into failure mode to exercise the
//!   client's error handling.
//!
//! [`CallCounts`] records every call so tests can assert that a code path did
//! *not* reach the backend.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::backend::Backend;
use crate::error::ApiError;
use crate::models::{AuthUser, Session};
use crate::query::Query;

const DEFAULT_OTP_CODE: &str = "123456";
const PUBLIC_BASE: &str = "memory://storage";
const SESSION_LIFETIME_SECS: i64 = 3600;

/// Number of calls made per backend operation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub send_otp: usize,
    pub verify_otp: usize,
    pub refresh_session: usize,
    pub select: usize,
    pub insert: usize,
    pub update: usize,
    pub delete: usize,
    pub upload: usize,
}

#[derive(Debug, Default)]
struct MemoryState {
    otp_code: String,
    auth_users: HashMap<String, String>,
    pending_codes: HashMap<String, String>,
    refresh_tokens: HashMap<String, AuthUser>,
    session: Option<Session>,
    tables: HashMap<String, Vec<Value>>,
    blobs: HashMap<String, Vec<u8>>,
    failing_tables: HashSet<String>,
    failing_uploads: HashSet<String>,
    calls: CallCounts,
}

/// In-memory Backend for testing and offline development.
#[derive(Clone, Debug)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::with_otp_code(DEFAULT_OTP_CODE)
    }

    /// Use `code` as the one-time code "emailed" by [`Backend::send_otp`].
    pub fn with_otp_code(code: &str) -> Self {
        let state = MemoryState {
            otp_code: code.to_string(),
            ..MemoryState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register an auth user for `email` and return its id.
    pub fn register_email(&self, email: &str) -> String {
        self.lock()
            .auth_users
            .entry(email.to_string())
            .or_insert_with(|| uuid::Uuid::new_v4().to_string())
            .clone()
    }

    /// Auth user id registered for `email`, if any.
    pub fn user_id_for(&self, email: &str) -> Option<String> {
        self.lock().auth_users.get(email).cloned()
    }

    /// Last code sent to `email` that has not been used yet.
    pub fn pending_code(&self, email: &str) -> Option<String> {
        self.lock().pending_codes.get(email).cloned()
    }

    /// Append rows to a table as-is.
    pub fn seed<T: Serialize>(&self, table: &str, rows: &[T]) -> Result<(), ApiError> {
        let values = rows
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        self.lock()
            .tables
            .entry(table.to_string())
            .or_default()
            .extend(values);
        Ok(())
    }

    /// Raw rows currently stored in `table`.
    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.lock().tables.get(table).cloned().unwrap_or_default()
    }

    /// Make every row call against `table` fail with a 500.
    pub fn fail_table(&self, table: &str) {
        self.lock().failing_tables.insert(table.to_string());
    }

    pub fn heal_table(&self, table: &str) {
        self.lock().failing_tables.remove(table);
    }

    /// Make uploads whose path starts with `prefix` fail.
    pub fn fail_uploads_under(&self, prefix: &str) {
        self.lock().failing_uploads.insert(prefix.to_string());
    }

    /// Bytes stored at `bucket/path`.
    pub fn blob(&self, bucket: &str, path: &str) -> Option<Vec<u8>> {
        self.lock().blobs.get(&format!("{bucket}/{path}")).cloned()
    }

    pub fn calls(&self) -> CallCounts {
        self.lock().calls
    }

    /// Push the current session's expiry into the past.
    pub fn expire_session(&self) {
        if let Some(session) = self.lock().session.as_mut() {
            session.expires_at = Some(Utc::now().timestamp() - 1);
        }
    }

    /// Invalidate every refresh token issued so far.
    pub fn revoke_refresh_tokens(&self) {
        self.lock().refresh_tokens.clear();
    }

    fn issue_session(state: &mut MemoryState, user: AuthUser) -> Session {
        let refresh_token = uuid::Uuid::new_v4().to_string();
        state.refresh_tokens.insert(refresh_token.clone(), user.clone());
        let mut session = Session {
            access_token: uuid::Uuid::new_v4().to_string(),
            refresh_token: Some(refresh_token),
            expires_in: Some(SESSION_LIFETIME_SECS),
            expires_at: None,
            user,
        };
        session.stamp_expiry(Utc::now().timestamp());
        state.session = Some(session.clone());
        session
    }

    fn refresh_locked(state: &mut MemoryState) -> Result<Session, ApiError> {
        state.calls.refresh_session += 1;
        let token = state.session.as_ref().and_then(|s| s.refresh_token.clone());
        let user = token.and_then(|token| state.refresh_tokens.remove(&token));
        match user {
            Some(user) => Ok(Self::issue_session(state, user)),
            None => {
                state.session = None;
                Err(ApiError::NotAuthenticated)
            }
        }
    }

    /// Refresh an expired session before a row or blob call.
    fn authorize(state: &mut MemoryState) -> Result<(), ApiError> {
        let now = Utc::now().timestamp();
        if state.session.as_ref().is_some_and(|s| s.is_expired(now)) {
            Self::refresh_locked(state)?;
        }
        Ok(())
    }

    fn check_table(state: &MemoryState, table: &str) -> Result<(), ApiError> {
        if state.failing_tables.contains(table) {
            return Err(ApiError::Status {
                status: 500,
                message: format!("{table} is unavailable"),
            });
        }
        Ok(())
    }
}

fn decode<R: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<R>, ApiError> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(ApiError::from))
        .collect()
}

impl Backend for MemoryBackend {
    async fn send_otp(&self, email: &str, create_user: bool) -> Result<(), ApiError> {
        let mut state = self.lock();
        state.calls.send_otp += 1;
        if !create_user && !state.auth_users.contains_key(email) {
            return Err(ApiError::Auth("Signups not allowed for otp".to_string()));
        }
        let code = state.otp_code.clone();
        state.pending_codes.insert(email.to_string(), code);
        Ok(())
    }

    async fn verify_otp(&self, email: &str, token: &str) -> Result<Session, ApiError> {
        let mut state = self.lock();
        state.calls.verify_otp += 1;
        if state.pending_codes.get(email).map(String::as_str) != Some(token) {
            return Err(ApiError::Auth("Token has expired or is invalid".to_string()));
        }
        state.pending_codes.remove(email);

        let user_id = state
            .auth_users
            .entry(email.to_string())
            .or_insert_with(|| uuid::Uuid::new_v4().to_string())
            .clone();
        let user = AuthUser {
            id: user_id,
            email: Some(email.to_string()),
        };
        Ok(Self::issue_session(&mut state, user))
    }

    async fn session(&self) -> Option<Session> {
        self.lock().session.clone()
    }

    async fn restore_session(&self) -> Option<Session> {
        let mut state = self.lock();
        Self::authorize(&mut state).ok()?;
        state.session.clone()
    }

    async fn refresh_session(&self) -> Result<Session, ApiError> {
        Self::refresh_locked(&mut self.lock())
    }

    async fn sign_out(&self) -> Result<(), ApiError> {
        let mut state = self.lock();
        if let Some(token) = state.session.take().and_then(|s| s.refresh_token) {
            state.refresh_tokens.remove(&token);
        }
        Ok(())
    }

    async fn select<T: DeserializeOwned>(&self, query: &Query) -> Result<Vec<T>, ApiError> {
        let rows = {
            let mut state = self.lock();
            state.calls.select += 1;
            Self::authorize(&mut state)?;
            Self::check_table(&state, query.table_name())?;
            match state.tables.get(query.table_name()) {
                Some(rows) => query.apply(rows),
                None => Vec::new(),
            }
        };
        decode(rows)
    }

    async fn insert<T: Serialize, R: DeserializeOwned>(
        &self,
        table: &str,
        row: &T,
    ) -> Result<Vec<R>, ApiError> {
        let mut value = serde_json::to_value(row)?;
        if let Value::Object(fields) = &mut value {
            fields
                .entry("id")
                .or_insert_with(|| Value::from(uuid::Uuid::new_v4().to_string()));
            fields
                .entry("created_at")
                .or_insert_with(|| Value::from(Utc::now().to_rfc3339()));
        }
        {
            let mut state = self.lock();
            state.calls.insert += 1;
            Self::authorize(&mut state)?;
            Self::check_table(&state, table)?;
            state
                .tables
                .entry(table.to_string())
                .or_default()
                .push(value.clone());
        }
        decode(vec![value])
    }

    async fn update<T: Serialize, R: DeserializeOwned>(
        &self,
        query: &Query,
        patch: &T,
    ) -> Result<Vec<R>, ApiError> {
        let patch = match serde_json::to_value(patch)? {
            Value::Object(fields) => fields,
            _ => return Ok(Vec::new()),
        };
        let updated = {
            let mut state = self.lock();
            state.calls.update += 1;
            Self::authorize(&mut state)?;
            Self::check_table(&state, query.table_name())?;
            let mut updated = Vec::new();
            if let Some(rows) = state.tables.get_mut(query.table_name()) {
                for row in rows.iter_mut().filter(|row| query.matches(row)) {
                    if let Value::Object(fields) = &mut *row {
                        for (key, value) in &patch {
                            fields.insert(key.clone(), value.clone());
                        }
                    }
                    updated.push(row.clone());
                }
            }
            updated
        };
        decode(updated)
    }

    async fn delete(&self, query: &Query) -> Result<(), ApiError> {
        let mut state = self.lock();
        state.calls.delete += 1;
        Self::authorize(&mut state)?;
        Self::check_table(&state, query.table_name())?;
        if let Some(rows) = state.tables.get_mut(query.table_name()) {
            rows.retain(|row| !query.matches(row));
        }
        Ok(())
    }

    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), ApiError> {
        let mut state = self.lock();
        state.calls.upload += 1;
        Self::authorize(&mut state)?;
        if state
            .failing_uploads
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
        {
            return Err(ApiError::Storage(format!("could not store {path}")));
        }
        state.blobs.insert(format!("{bucket}/{path}"), bytes);
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{PUBLIC_BASE}/{bucket}/{path}")
    }
}
