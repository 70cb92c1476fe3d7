//! Resend cooldown for one-time codes.
//!
//! [`ResendCountdown`] is plain state advanced by [`tick`](ResendCountdown::tick);
//! the hooks below drive it from a one-second timer owned by the calling
//! component, so the timer stops when the component unmounts.

use std::time::Duration;

use dioxus::prelude::*;

pub const RESEND_COOLDOWN_SECS: u32 = 60;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResendCountdown {
    remaining: u32,
}

impl ResendCountdown {
    /// (Re)start from the full cooldown.
    pub fn start(&mut self) {
        self.remaining = RESEND_COOLDOWN_SECS;
    }

    pub fn stop(&mut self) {
        self.remaining = 0;
    }

    /// Advance by one second. Returns `true` on the tick that reaches zero.
    pub fn tick(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        self.remaining == 0
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_running(&self) -> bool {
        self.remaining > 0
    }

    pub fn can_resend(&self) -> bool {
        self.remaining == 0
    }
}

pub(crate) async fn sleep(duration: Duration) {
    #[cfg(target_arch = "wasm32")]
    gloo_timers::future::sleep(duration).await;
    #[cfg(not(target_arch = "wasm32"))]
    tokio::time::sleep(duration).await;
}

/// Call `on_tick` once per second for as long as the current component lives.
pub fn use_countdown_ticker(mut on_tick: impl FnMut() + 'static) {
    use_hook(move || {
        spawn(async move {
            loop {
                sleep(Duration::from_secs(1)).await;
                on_tick();
            }
        })
    });
}

/// A [`ResendCountdown`] signal ticked by a scope-owned timer.
pub fn use_resend_countdown() -> Signal<ResendCountdown> {
    let mut countdown = use_signal(ResendCountdown::default);
    use_countdown_ticker(move || {
        if countdown.peek().is_running() {
            countdown.write().tick();
        }
    });
    countdown
}
