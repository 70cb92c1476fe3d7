//! # API crate: the remote side of Homee
//!
//! Everything the app says to its hosted backend goes through this crate. The
//! screens never build URLs or name collections themselves; they call
//! [`HomeeApi`], which talks to a [`Backend`].
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`backend`] | The `Backend` trait: OTP auth, generic row operations, blob uploads |
//! | [`supabase`] | reqwest implementation of `Backend` against a Supabase-style REST API |
//! | [`memory`] | In-memory `Backend` with call counters, used by tests and offline development |
//! | [`query`] | Table query builder, rendered to PostgREST params or evaluated against JSON rows |
//! | [`homee`] | Typed data access: profiles, groups, albums, images, friends, uploads |
//! | [`cache`] | Per-user group cache with TTL and request de-duplication |
//! | [`link`] | Profile deep links carried in QR codes |
//! | [`models`] | Row and payload types |
//! | [`settings`] | Layered configuration (defaults, `homee.toml`, `HOMEE_*` env) |
//!
//! ## Wiring
//!
//! ```no_run
//! # async fn run() -> Result<(), api::ApiError> {
//! use api::{Backend, HomeeApi, Settings, SupabaseClient};
//!
//! let settings = Settings::load()?;
//! let client = SupabaseClient::new(&settings.backend, store::MemoryStore::new())?;
//! client.restore_session().await;
//! let api = HomeeApi::new(client, settings.storage.bucket.clone());
//! let groups = api.groups_for_user("user-id").await?;
//! # let _ = groups;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod cache;
pub mod error;
pub mod homee;
pub mod link;
pub mod memory;
pub mod models;
pub mod query;
pub mod settings;
pub mod supabase;

pub use backend::Backend;
pub use cache::GroupCache;
pub use error::ApiError;
pub use homee::{HomeeApi, UploadKind};
pub use link::{parse_profile_link, profile_link, LinkError, ProfileHandle};
pub use memory::{CallCounts, MemoryBackend};
pub use settings::Settings;
pub use supabase::SupabaseClient;
