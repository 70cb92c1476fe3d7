//! # Client settings
//!
//! Layered the usual way: built-in defaults, then an optional `homee.toml` in the
//! working directory, then environment variables prefixed with `HOMEE_` using a
//! double underscore between sections (`HOMEE_BACKEND__URL`,
//! `HOMEE_BACKEND__ANON_KEY`, `HOMEE_LINKS__DOMAIN`, ...). A `.env` file is
//! loaded first via `dotenvy` when present.
//!
//! ```toml
//! [backend]
//! url = "https://project.supabase.co"
//! anon_key = "public-anon-key"
//!
//! [storage]
//! bucket = "images"
//!
//! [links]
//! domain = "homee.app"
//!
//! [cache]
//! ttl_secs = 30
//! ```

use std::time::Duration;

use config::{Config, ConfigBuilder, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BackendSettings {
    /// Project base URL, without trailing slash.
    pub url: String,
    /// Public (anon) API key sent with every request.
    pub anon_key: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct StorageSettings {
    /// Blob bucket that holds avatars, backgrounds and album images.
    pub bucket: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LinkSettings {
    /// Host used in shareable profile links and QR codes.
    pub domain: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CacheSettings {
    pub ttl_secs: u64,
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Settings {
    pub backend: BackendSettings,
    pub storage: StorageSettings,
    pub links: LinkSettings,
    pub cache: CacheSettings,
}

impl Settings {
    /// Load settings from defaults, `homee.toml` and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        defaults()?
            .add_source(
                File::with_name("homee.toml")
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                Environment::with_prefix("HOMEE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Load settings from an embedded TOML document layered over the defaults.
    ///
    /// Used on platforms without a writable working directory, where the
    /// configuration ships inside the app bundle.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        defaults()?
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    /// Strip the trailing slash so URL joins stay predictable.
    pub fn backend_url(&self) -> &str {
        self.backend.url.trim_end_matches('/')
    }
}

fn defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError> {
    Config::builder()
        .set_default("backend.url", "http://localhost:54321")?
        .set_default("backend.anon_key", "")?
        .set_default("storage.bucket", "images")?
        .set_default("links.domain", "homee.app")?
        .set_default("cache.ttl_secs", 30_i64)
}
