//! # Filesystem-backed key-value store
//!
//! [`FileStore`] is a [`KeyValueStore`] implementation that keeps each key in its
//! own file. It is used on desktop and mobile platforms so that client state
//! (the featured-group selection, the cached auth session) survives restarts.
//!
//! ## Layout
//!
//! ```text
//! <base_dir>/
//! ├── featuredGroupIds       # JSON array of group ids
//! └── homee.session          # JSON-encoded auth session
//! ```
//!
//! ## Platform data directories
//!
//! Use [`dirs::data_dir()`] to obtain a platform-appropriate base:
//!
//! | Platform | Path |
//! |----------|------|
//! | macOS / iOS | `~/Library/Application Support/homee/` |
//! | Linux | `~/.local/share/homee/` |
//! | Windows | `C:\Users\<user>\AppData\Roaming\homee\` |
//! | Android | App-internal storage (via `dirs`) |
//!
//! [`dirs::data_dir()`]: https://docs.rs/dirs

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::kv::KeyValueStore;

/// Filesystem-backed KeyValueStore for desktop and mobile persistence.
#[derive(Clone, Debug)]
pub struct FileStore {
    base: PathBuf,
}

impl FileStore {
    pub fn new(base: PathBuf) -> Self {
        Self { base }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    // Keys never escape the base directory.
    fn key_path(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| match c {
                '/' | '\\' | ':' => '_',
                c => c,
            })
            .collect();
        let name = if name.is_empty() || name.chars().all(|c| c == '.') {
            format!("_{name}")
        } else {
            name
        };
        self.base.join(name)
    }

    /// Delete every persisted key (used when a user signs out).
    pub fn clear(&self) -> Result<(), StoreError> {
        match std::fs::remove_dir_all(&self.base) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Option<String> {
        std::fs::read_to_string(self.key_path(key)).ok()
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.base)?;
        std::fs::write(self.key_path(key), value)?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        match std::fs::remove_file(self.key_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
