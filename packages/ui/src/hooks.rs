//! Hooks that connect the flows to component state.
//!
//! Flow state lives in signals. Async operations run on a clone and the result
//! is written back with [`commit_flow`], so no signal borrow is held across an
//! await and the resend countdown keeps the ticks it received meanwhile:
//!
//! ```ignore
//! let mut flow = use_onboarding_flow(AuthMode::Signup);
//! let submit = move |email: String| async move {
//!     let mut next = flow();
//!     let before = next.countdown();
//!     let _ = next.request_code(&email).await;
//!     commit_flow(&mut flow, before, next);
//! };
//! ```

use api::Backend;
use dioxus::prelude::*;
use store::Group;

use crate::countdown::{use_countdown_ticker, ResendCountdown};
use crate::groups::load_display_groups;
use crate::onboarding::{AuthMode, OnboardingFlow};
use crate::services::{use_services, AppBackend};

/// Onboarding state with its resend countdown ticking once per second while
/// the component is mounted.
pub fn use_onboarding_flow(mode: AuthMode) -> Signal<OnboardingFlow<AppBackend>> {
    let services = use_services();
    let mut flow = use_signal(move || OnboardingFlow::new(services.api, mode));
    use_countdown_ticker(move || {
        if flow.peek().countdown().is_running() {
            flow.write().tick_countdown();
        }
    });
    flow
}

/// Store the result of an operation run on a copy of `flow`. `before` is the
/// countdown the copy started with.
pub fn commit_flow<B: Backend + 'static>(
    flow: &mut Signal<OnboardingFlow<B>>,
    before: ResendCountdown,
    mut next: OnboardingFlow<B>,
) {
    let live = flow.peek().countdown();
    next.adopt_ticks(before, live);
    flow.set(next);
}

/// Featured group ids, hydrated from local storage on mount.
pub fn use_featured_groups() -> Signal<Vec<String>> {
    let services = use_services();
    let mut ids = use_signal(Vec::new);
    use_future(move || {
        let featured = services.featured.clone();
        async move {
            ids.set(featured.hydrate().await);
        }
    });
    ids
}

/// The user's groups in display order. Restart the resource after a write to
/// pick up the change; the shared cache has already been invalidated by then.
pub fn use_display_groups(user_id: String) -> Resource<Vec<Group>> {
    let services = use_services();
    use_resource(move || {
        let services = services.clone();
        let user_id = user_id.clone();
        async move {
            services.featured.hydrate().await;
            load_display_groups(
                &services.api,
                &services.groups,
                &services.featured,
                &user_id,
            )
            .await
        }
    })
}
