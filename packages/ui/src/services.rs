//! Application services shared through Dioxus context.
//!
//! [`AppServices`] bundles the long-lived handles every screen needs. It is
//! built once by [`ServicesProvider`] and read with [`use_services`]. The
//! local store behind it depends on the platform:
//! - **Web** (WASM + `web` feature): `localStorage` via [`store::LocalStore`]
//! - **Desktop / Mobile** (native): files under `<data_dir>/homee/` via [`store::FileStore`]

use api::{ApiError, GroupCache, HomeeApi, Settings, SupabaseClient};
use dioxus::prelude::*;
use store::FeaturedGroups;

#[cfg(all(target_arch = "wasm32", feature = "web"))]
pub type PlatformStore = store::LocalStore;
#[cfg(not(all(target_arch = "wasm32", feature = "web")))]
pub type PlatformStore = store::FileStore;

pub type AppBackend = SupabaseClient<PlatformStore>;
pub type AppApi = HomeeApi<AppBackend>;

/// Create the platform-appropriate local store.
pub fn make_store() -> PlatformStore {
    #[cfg(all(target_arch = "wasm32", feature = "web"))]
    {
        store::LocalStore::new()
    }
    #[cfg(not(all(target_arch = "wasm32", feature = "web")))]
    {
        let base = dirs::data_dir()
            .unwrap_or_else(|| std::path::PathBuf::from("."))
            .join("homee");
        store::FileStore::new(base)
    }
}

#[derive(Clone, Debug)]
pub struct AppServices {
    pub api: AppApi,
    pub featured: FeaturedGroups<PlatformStore>,
    pub groups: GroupCache,
    pub settings: Settings,
}

impl AppServices {
    pub fn from_settings(settings: Settings) -> Result<Self, ApiError> {
        let store = make_store();
        let client = SupabaseClient::new(&settings.backend, store.clone())?;
        Ok(Self {
            api: HomeeApi::new(client, settings.storage.bucket.clone()),
            featured: FeaturedGroups::new(store),
            groups: GroupCache::new(settings.cache.ttl()),
            settings,
        })
    }
}

pub fn use_services() -> AppServices {
    use_context::<AppServices>()
}

/// Build [`AppServices`] from the loaded settings and provide them to
/// `children`.
#[component]
pub fn ServicesProvider(children: Element) -> Element {
    // Provided once, on first render.
    let started = use_hook(|| {
        let services = Settings::load()
            .map_err(ApiError::from)
            .and_then(AppServices::from_settings);
        match services {
            Ok(services) => {
                provide_context(services);
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to start services: {}", e);
                Err(e.to_string())
            }
        }
    });

    match started {
        Ok(()) => rsx! {
            {children}
        },
        Err(message) => rsx! {
            p { class: "startup-error", "{message}" }
        },
    }
}
