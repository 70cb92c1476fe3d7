//! # HTTP backend for a Supabase-style platform
//!
//! [`SupabaseClient`] implements [`Backend`] over the platform's three HTTP
//! surfaces:
//!
//! | Capability | Endpoint |
//! |------------|----------|
//! | Send OTP | `POST /auth/v1/otp` with `{email, create_user}` |
//! | Verify OTP | `POST /auth/v1/verify` with `{type: "email", email, token}` |
//! | Refresh | `POST /auth/v1/token?grant_type=refresh_token` with `{refresh_token}` |
//! | Sign out | `POST /auth/v1/logout` |
//! | Rows | `GET/POST/PATCH/DELETE /rest/v1/<table>?<filters>` |
//! | Upload | `POST /storage/v1/object/<bucket>/<path>` |
//! | Public URL | `/storage/v1/object/public/<bucket>/<path>` |
//!
//! Every request carries the project's anon key in `apikey`; the bearer token is
//! the session's access token once signed in, otherwise the anon key.
//!
//! ## Session persistence
//!
//! The session lives in memory for the lifetime of the process and is mirrored
//! into a [`KeyValueStore`] under [`SESSION_KEY`] so the next launch can call
//! [`restore_session`](Backend::restore_session) instead of sending the
//! user through the OTP flow again. A failed mirror write is logged and
//! otherwise ignored: the in-memory session is still valid.
//!
//! ## Expiry
//!
//! The session carries an absolute `expires_at`. Row and blob requests refresh
//! an expired session first, and refresh once more and resend when the backend
//! answers 401. A refresh the auth service rejects ends the session; a refresh
//! that fails in transit keeps it so an offline launch does not sign the user
//! out.

use std::sync::Arc;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use store::KeyValueStore;
use tokio::sync::RwLock;

use crate::backend::Backend;
use crate::error::ApiError;
use crate::models::{Session, SESSION_KEY};
use crate::query::Query;
use crate::settings::BackendSettings;

/// Backend client talking to the hosted platform over HTTP.
pub struct SupabaseClient<S> {
    inner: Arc<Inner<S>>,
}

struct Inner<S> {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    session: RwLock<Option<Session>>,
    store: S,
}

impl<S> Clone for SupabaseClient<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> std::fmt::Debug for SupabaseClient<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseClient")
            .field("base_url", &self.inner.base_url)
            .finish_non_exhaustive()
    }
}

impl<S: KeyValueStore> SupabaseClient<S> {
    pub fn new(settings: &BackendSettings, store: S) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            inner: Arc::new(Inner {
                http,
                base_url: settings.url.trim_end_matches('/').to_string(),
                anon_key: settings.anon_key.clone(),
                session: RwLock::new(None),
                store,
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    async fn load_stored_session(&self) -> Option<Session> {
        let raw = self.inner.store.get(SESSION_KEY).await?;
        match serde_json::from_str::<Session>(&raw) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::warn!("Discarding unreadable stored session: {}", e);
                let _ = self.inner.store.remove(SESSION_KEY).await;
                None
            }
        }
    }

    async fn set_session(&self, session: Option<Session>) {
        let mirrored = match &session {
            Some(session) => match serde_json::to_string(session) {
                Ok(raw) => self.inner.store.set(SESSION_KEY, raw).await,
                Err(e) => Err(e.into()),
            },
            None => self.inner.store.remove(SESSION_KEY).await,
        };
        if let Err(e) = mirrored {
            tracing::warn!("Failed to mirror session to device storage: {}", e);
        }
        *self.inner.session.write().await = session;
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.inner.base_url)
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.inner.base_url)
    }

    fn object_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/object/{bucket}/{}",
            self.inner.base_url,
            path.trim_start_matches('/')
        )
    }

    async fn request(&self, method: Method, url: String) -> RequestBuilder {
        let bearer = match self.inner.session.read().await.as_ref() {
            Some(session) => session.access_token.clone(),
            None => self.inner.anon_key.clone(),
        };
        self.inner
            .http
            .request(method, url)
            .header("apikey", &self.inner.anon_key)
            .bearer_auth(bearer)
    }

    /// Send an authorized request built by `build`, keeping the session fresh.
    async fn send(
        &self,
        method: Method,
        url: String,
        build: impl Fn(RequestBuilder) -> RequestBuilder,
    ) -> Result<Response, ApiError> {
        if self.session().await.is_some_and(|s| s.is_expired(now())) {
            self.refresh_session().await?;
        }
        let response = build(self.request(method.clone(), url.clone()).await)
            .send()
            .await?;
        if response.status() != StatusCode::UNAUTHORIZED || self.session().await.is_none() {
            return Ok(response);
        }

        tracing::info!("Access token rejected, refreshing session");
        self.refresh_session().await?;
        Ok(build(self.request(method, url).await).send().await?)
    }

    async fn request_refresh(&self, refresh_token: &str) -> Result<Session, ApiError> {
        let response = self
            .inner
            .http
            .post(self.auth_url("token"))
            .query(&[("grant_type", "refresh_token")])
            .header("apikey", &self.inner.anon_key)
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await?;
        let mut session: Session = check(response)
            .await
            .map_err(into_auth_error)?
            .json()
            .await?;
        session.stamp_expiry(now());
        Ok(session)
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Whether a failed refresh means the refresh token itself is no good.
fn refresh_rejected(error: &ApiError) -> bool {
    match error {
        ApiError::Auth(_) | ApiError::NotAuthenticated => true,
        ApiError::Status { status, .. } => (400..500).contains(status),
        _ => false,
    }
}

impl<S: KeyValueStore> Backend for SupabaseClient<S> {
    async fn send_otp(&self, email: &str, create_user: bool) -> Result<(), ApiError> {
        let response = self
            .request(Method::POST, self.auth_url("otp"))
            .await
            .json(&json!({ "email": email, "create_user": create_user }))
            .send()
            .await?;
        check(response).await.map_err(into_auth_error)?;
        tracing::info!("One-time code sent");
        Ok(())
    }

    async fn verify_otp(&self, email: &str, token: &str) -> Result<Session, ApiError> {
        let response = self
            .request(Method::POST, self.auth_url("verify"))
            .await
            .json(&json!({ "type": "email", "email": email, "token": token }))
            .send()
            .await?;
        let mut session: Session = check(response)
            .await
            .map_err(into_auth_error)?
            .json()
            .await?;
        session.stamp_expiry(now());
        self.set_session(Some(session.clone())).await;
        tracing::info!("Signed in as {}", session.user.id);
        Ok(session)
    }

    async fn session(&self) -> Option<Session> {
        self.inner.session.read().await.clone()
    }

    async fn restore_session(&self) -> Option<Session> {
        let session = self.load_stored_session().await?;
        let expired = session.is_expired(now());
        *self.inner.session.write().await = Some(session.clone());
        if !expired {
            return Some(session);
        }

        tracing::info!("Stored session expired, refreshing");
        if let Err(e) = self.refresh_session().await {
            tracing::warn!("Could not refresh stored session: {}", e);
        }
        self.session().await
    }

    async fn refresh_session(&self) -> Result<Session, ApiError> {
        let Some(refresh_token) = self.session().await.and_then(|s| s.refresh_token) else {
            self.set_session(None).await;
            return Err(ApiError::NotAuthenticated);
        };

        match self.request_refresh(&refresh_token).await {
            Ok(session) => {
                self.set_session(Some(session.clone())).await;
                Ok(session)
            }
            Err(e) if refresh_rejected(&e) => {
                tracing::warn!("Refresh token rejected, signing out: {}", e);
                self.set_session(None).await;
                Err(ApiError::NotAuthenticated)
            }
            Err(e) => Err(e),
        }
    }

    async fn sign_out(&self) -> Result<(), ApiError> {
        let result = match self.session().await {
            Some(_) => {
                let response = self
                    .request(Method::POST, self.auth_url("logout"))
                    .await
                    .send()
                    .await;
                match response {
                    Ok(response) => check(response).await.map(|_| ()),
                    Err(e) => Err(e.into()),
                }
            }
            None => Ok(()),
        };
        // The local session goes away even if the server call failed.
        self.set_session(None).await;
        result
    }

    async fn select<T: DeserializeOwned>(&self, query: &Query) -> Result<Vec<T>, ApiError> {
        let params = query.to_params();
        let response = self
            .send(Method::GET, self.rest_url(query.table_name()), |r| {
                r.query(&params)
            })
            .await?;
        Ok(check(response).await?.json().await?)
    }

    async fn insert<T: Serialize, R: DeserializeOwned>(
        &self,
        table: &str,
        row: &T,
    ) -> Result<Vec<R>, ApiError> {
        let response = self
            .send(Method::POST, self.rest_url(table), |r| {
                r.header("Prefer", "return=representation").json(row)
            })
            .await?;
        Ok(check(response).await?.json().await?)
    }

    async fn update<T: Serialize, R: DeserializeOwned>(
        &self,
        query: &Query,
        patch: &T,
    ) -> Result<Vec<R>, ApiError> {
        let params = query.filter_params();
        let response = self
            .send(Method::PATCH, self.rest_url(query.table_name()), |r| {
                r.header("Prefer", "return=representation")
                    .query(&params)
                    .json(patch)
            })
            .await?;
        Ok(check(response).await?.json().await?)
    }

    async fn delete(&self, query: &Query) -> Result<(), ApiError> {
        let params = query.filter_params();
        let response = self
            .send(Method::DELETE, self.rest_url(query.table_name()), |r| {
                r.query(&params)
            })
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ApiError> {
        let response = self
            .send(Method::POST, self.object_url(bucket, path), |r| {
                r.header(CONTENT_TYPE, content_type)
                    .header("x-upsert", "true")
                    .body(bytes.clone())
            })
            .await?;
        check(response).await.map_err(|e| match e {
            ApiError::Status { message, .. } => ApiError::Storage(message),
            other => other,
        })?;
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{bucket}/{}",
            self.inner.base_url,
            path.trim_start_matches('/')
        )
    }
}

/// Turn a non-success response into [`ApiError::Status`].
async fn check(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    });
    Err(ApiError::Status {
        status: status.as_u16(),
        message,
    })
}

/// Auth endpoints answer 4xx for "unknown email" and "wrong code".
fn into_auth_error(error: ApiError) -> ApiError {
    match error {
        ApiError::Status { status, message } if (400..500).contains(&status) => {
            ApiError::Auth(message)
        }
        other => other,
    }
}

/// Pull a human-readable message out of an error body.
fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["msg", "message", "error_description", "error"]
        .iter()
        .find_map(|key| value.get(*key)?.as_str().map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AuthUser;
    use store::MemoryStore;

    fn client(store: MemoryStore) -> SupabaseClient<MemoryStore> {
        let settings = BackendSettings {
            url: "https://demo.supabase.co/".to_string(),
            anon_key: "anon".to_string(),
        };
        SupabaseClient::new(&settings, store).unwrap()
    }

    fn session() -> Session {
        Session {
            access_token: "token".to_string(),
            refresh_token: Some("refresh".to_string()),
            expires_in: Some(3600),
            expires_at: None,
            user: AuthUser {
                id: "u1".to_string(),
                email: Some("a@b.com".to_string()),
            },
        }
    }

    #[test]
    fn test_urls() {
        let client = client(MemoryStore::new());
        assert_eq!(client.base_url(), "https://demo.supabase.co");
        assert_eq!(client.auth_url("otp"), "https://demo.supabase.co/auth/v1/otp");
        assert_eq!(client.rest_url("groups"), "https://demo.supabase.co/rest/v1/groups");
        assert_eq!(
            client.object_url("images", "/avatars/u1/a.png"),
            "https://demo.supabase.co/storage/v1/object/images/avatars/u1/a.png"
        );
        assert_eq!(
            client.public_url("images", "avatars/u1/a.png"),
            "https://demo.supabase.co/storage/v1/object/public/images/avatars/u1/a.png"
        );
    }

    #[tokio::test]
    async fn test_restore_session() {
        let store = MemoryStore::new();
        store
            .set(SESSION_KEY, serde_json::to_string(&session()).unwrap())
            .await
            .unwrap();

        let client = client(store);
        assert!(client.session().await.is_none());
        assert_eq!(client.restore_session().await, Some(session()));
        assert_eq!(client.session().await, Some(session()));
    }

    #[tokio::test]
    async fn test_restore_drops_expired_session_without_refresh_token() {
        let store = MemoryStore::new();
        let expired = Session {
            refresh_token: None,
            expires_at: Some(now() - 60),
            ..session()
        };
        store
            .set(SESSION_KEY, serde_json::to_string(&expired).unwrap())
            .await
            .unwrap();

        let client = client(store.clone());
        assert!(client.restore_session().await.is_none());
        assert!(client.session().await.is_none());
        assert!(store.get(SESSION_KEY).await.is_none());
    }

    #[test]
    fn test_refresh_rejection_is_told_apart_from_outages() {
        assert!(refresh_rejected(&ApiError::Auth("Invalid Refresh Token".to_string())));
        assert!(refresh_rejected(&ApiError::Status {
            status: 401,
            message: "Unauthorized".to_string(),
        }));
        assert!(!refresh_rejected(&ApiError::Status {
            status: 502,
            message: "Bad Gateway".to_string(),
        }));
        assert!(!refresh_rejected(&ApiError::Storage("x".to_string())));
    }

    #[tokio::test]
    async fn test_restore_discards_corrupt_session() {
        let store = MemoryStore::new();
        store.set(SESSION_KEY, "garbage".to_string()).await.unwrap();

        let client = client(store.clone());
        assert!(client.restore_session().await.is_none());
        assert!(store.get(SESSION_KEY).await.is_none());
    }

    #[tokio::test]
    async fn test_session_is_mirrored() {
        let store = MemoryStore::new();
        let client = client(store.clone());

        client.set_session(Some(session())).await;
        let raw = store.get(SESSION_KEY).await.unwrap();
        assert_eq!(serde_json::from_str::<Session>(&raw).unwrap(), session());

        // Signing out without a server session only clears local state
        client.inner.session.write().await.take();
        client.sign_out().await.unwrap();
        assert!(store.get(SESSION_KEY).await.is_none());
    }

    #[test]
    fn test_error_message() {
        assert_eq!(
            error_message(r#"{"code":422,"msg":"Signups not allowed for otp"}"#).as_deref(),
            Some("Signups not allowed for otp")
        );
        assert_eq!(
            error_message(r#"{"error":"invalid_grant","error_description":"Token has expired"}"#)
                .as_deref(),
            Some("Token has expired")
        );
        assert!(error_message("<html>").is_none());
    }

    #[test]
    fn test_auth_error_mapping() {
        let rejected = into_auth_error(ApiError::Status {
            status: 422,
            message: "Signups not allowed for otp".to_string(),
        });
        assert!(matches!(rejected, ApiError::Auth(ref m) if m == "Signups not allowed for otp"));

        let outage = into_auth_error(ApiError::Status {
            status: 503,
            message: "Service Unavailable".to_string(),
        });
        assert!(matches!(outage, ApiError::Status { status: 503, .. }));
    }
}
