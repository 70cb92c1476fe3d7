//! # Backend trait: the hosted platform as seen by the client
//!
//! Everything durable lives in a hosted backend-as-a-service. [`Backend`] is the
//! single seam the rest of the client talks to; it exposes three capabilities
//! and nothing about the wire protocol behind them:
//!
//! | Capability | Methods |
//! |------------|---------|
//! | Auth service | [`send_otp`](Backend::send_otp), [`verify_otp`](Backend::verify_otp), [`session`](Backend::session), [`restore_session`](Backend::restore_session), [`refresh_session`](Backend::refresh_session), [`sign_out`](Backend::sign_out) |
//! | Row API | [`select`](Backend::select), [`insert`](Backend::insert), [`update`](Backend::update), [`delete`](Backend::delete) |
//! | Blob store | [`upload`](Backend::upload), [`public_url`](Backend::public_url) |
//!
//! Implementations: [`crate::SupabaseClient`] (HTTP) and
//! [`crate::MemoryBackend`] (in-process, for tests and offline development).
//!
//! Row and blob calls refresh an expired session before sending, and once more
//! when the backend rejects the access token. A rejected refresh ends the
//! session and the call fails with [`ApiError::NotAuthenticated`]. Nothing
//! else is retried: every other failure is returned to the caller, which
//! surfaces it to the user.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ApiError;
use crate::models::Session;
use crate::query::Query;

/// Async interface to the hosted backend.
pub trait Backend {
    /// Ask the auth service to email a one-time code. With `create_user`
    /// false the request is refused for unknown addresses.
    fn send_otp(
        &self,
        email: &str,
        create_user: bool,
    ) -> impl std::future::Future<Output = Result<(), ApiError>>;

    /// Exchange an emailed code for a session.
    fn verify_otp(
        &self,
        email: &str,
        token: &str,
    ) -> impl std::future::Future<Output = Result<Session, ApiError>>;

    /// The session currently held by the client, if any.
    fn session(&self) -> impl std::future::Future<Output = Option<Session>>;

    /// Reload the session kept from a previous launch, refreshing it when the
    /// access token has expired. `None` when there is no usable session.
    fn restore_session(&self) -> impl std::future::Future<Output = Option<Session>>;

    /// Exchange the refresh token for a new session. A rejected refresh
    /// drops the session and returns [`ApiError::NotAuthenticated`].
    fn refresh_session(&self) -> impl std::future::Future<Output = Result<Session, ApiError>>;

    fn sign_out(&self) -> impl std::future::Future<Output = Result<(), ApiError>>;

    fn select<T: DeserializeOwned>(
        &self,
        query: &Query,
    ) -> impl std::future::Future<Output = Result<Vec<T>, ApiError>>;

    /// Insert one row and return the stored representation.
    fn insert<T: Serialize, R: DeserializeOwned>(
        &self,
        table: &str,
        row: &T,
    ) -> impl std::future::Future<Output = Result<Vec<R>, ApiError>>;

    /// Patch every row selected by `query` and return the updated rows.
    fn update<T: Serialize, R: DeserializeOwned>(
        &self,
        query: &Query,
        patch: &T,
    ) -> impl std::future::Future<Output = Result<Vec<R>, ApiError>>;

    fn delete(&self, query: &Query) -> impl std::future::Future<Output = Result<(), ApiError>>;

    fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> impl std::future::Future<Output = Result<(), ApiError>>;

    /// Public URL of an uploaded object. Pure string building, no request.
    fn public_url(&self, bucket: &str, path: &str) -> String;
}
