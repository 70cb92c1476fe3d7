//! Client state for the Homee app, shared by every platform shell.
//!
//! The flows here are plain structs and async functions over [`api::HomeeApi`],
//! tested against [`api::MemoryBackend`]. The Dioxus layer on top is thin:
//! providers that put services and auth state into context, and hooks that
//! keep flow state in signals.

pub mod connect;
pub mod countdown;
pub mod error;
pub mod groups;
pub mod onboarding;
pub mod profile_edit;
pub mod validation;

mod auth;
pub use auth::{load_auth_state, use_auth, AuthProvider, AuthState, SignOutButton};

mod hooks;
pub use hooks::{commit_flow, use_display_groups, use_featured_groups, use_onboarding_flow};

mod services;
pub use services::{
    make_store, use_services, AppApi, AppBackend, AppServices, PlatformStore, ServicesProvider,
};

pub use connect::connect_via_link;
pub use countdown::{use_resend_countdown, ResendCountdown, RESEND_COOLDOWN_SECS};
pub use error::{FlowError, ValidationError};
pub use groups::{load_display_groups, toggle_featured};
pub use onboarding::{AuthMode, OnboardingFlow, OnboardingStep, RegistrationForm, SignupInfo};
pub use profile_edit::{save_profile_edits, ImageUpload, ProfileEdits, ProfileSaveReport};
