//! Authentication context and hooks for the UI.

use api::models::{Profile, Session};
use api::{ApiError, Backend, HomeeApi};
use dioxus::prelude::*;

use crate::services::use_services;

/// Authentication state for the application.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthState {
    pub session: Option<Session>,
    pub profile: Option<Profile>,
    pub loading: bool,
}

impl Default for AuthState {
    fn default() -> Self {
        Self {
            session: None,
            profile: None,
            loading: true,
        }
    }
}

impl AuthState {
    pub fn user_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.user.id.as_str())
    }

    /// Signed in with a profile that has passed onboarding.
    pub fn is_complete(&self) -> bool {
        self.session.is_some() && self.profile.as_ref().is_some_and(Profile::has_avatar)
    }
}

/// Restore the saved session and load its profile.
///
/// A session the backend no longer accepts counts as signed out, so an
/// expired login is never mistaken for an unregistered one.
pub async fn load_auth_state<B: Backend>(api: &HomeeApi<B>) -> AuthState {
    let mut session = api.restore_session().await;
    let profile = match &session {
        Some(current) => match api.profile_by_id(&current.user.id).await {
            Ok(profile) => profile,
            Err(ApiError::NotAuthenticated) => {
                tracing::warn!("Saved session is no longer valid");
                session = None;
                None
            }
            Err(e) => {
                tracing::error!("Failed to load profile: {}", e);
                None
            }
        },
        None => None,
    };
    AuthState {
        session,
        profile,
        loading: false,
    }
}

/// Get the current authentication state.
/// Returns a signal that updates when the user signs in or out.
pub fn use_auth() -> Signal<AuthState> {
    use_context::<Signal<AuthState>>()
}

/// Provider component that restores the saved session on mount.
/// Must be rendered inside [`crate::ServicesProvider`].
#[component]
pub fn AuthProvider(children: Element) -> Element {
    let services = use_services();
    let mut auth_state = use_signal(AuthState::default);

    let _ = use_resource(move || {
        let services = services.clone();
        async move {
            auth_state.set(load_auth_state(&services.api).await);
        }
    });

    use_context_provider(|| auth_state);

    rsx! {
        {children}
    }
}

/// Button to sign the current user out.
#[component]
pub fn SignOutButton(
    #[props(default = "Sign out".to_string())] label: String,
    #[props(default = "".to_string())] class: String,
) -> Element {
    let services = use_services();
    let mut auth_state = use_auth();

    let onclick = move |_| {
        let services = services.clone();
        async move {
            match services.api.sign_out().await {
                Ok(()) => {
                    services.groups.invalidate_all().await;
                    auth_state.set(AuthState {
                        loading: false,
                        ..AuthState::default()
                    });
                }
                Err(e) => tracing::error!("Failed to sign out: {}", e),
            }
        }
    };

    rsx! {
        button {
            class: "{class}",
            onclick: onclick,
            "{label}"
        }
    }
}
