//! # Email one-time-code onboarding
//!
//! [`OnboardingFlow`] takes a user from typing an email address to a signed-in
//! session with a complete profile:
//!
//! ```text
//! EmailEntry -> OtpSent -> Verifying -> ProfileIncomplete -> AvatarMissing -> Authenticated
//!                                    \-> AvatarMissing ----/                /
//!                                     \-> Authenticated --------------------
//! ```
//!
//! Every failing step leaves the flow in a well-defined step and records a
//! message for the inline error slot of the current screen. Input that fails
//! validation never reaches the backend.
//!
//! The flow is plain state: components keep it in a `Signal`, clone it out,
//! await an operation on the clone and write it back with
//! [`crate::commit_flow`], which keeps countdown ticks that landed in
//! the meantime. The resend cooldown is
//! advanced with [`tick_countdown`](OnboardingFlow::tick_countdown) by a timer
//! owned by the screen (see [`crate::countdown::use_countdown_ticker`]).

use api::models::{NewProfile, Profile, ProfileUpdate, Session};
use api::{Backend, HomeeApi, UploadKind};

use crate::countdown::ResendCountdown;
use crate::error::FlowError;
use crate::validation::{validate_email, validate_name, validate_otp, validate_username};

/// Whether the email is expected to belong to an existing account.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AuthMode {
    #[default]
    Login,
    Signup,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OnboardingStep {
    #[default]
    EmailEntry,
    OtpSent,
    Verifying,
    ProfileIncomplete,
    AvatarMissing,
    Authenticated,
}

/// The normalized email a code was sent to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignupInfo {
    pub email: String,
}

/// Fields collected on the registration screen.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegistrationForm {
    pub username: String,
    pub name: String,
}

#[derive(Clone, Debug)]
pub struct OnboardingFlow<B> {
    api: HomeeApi<B>,
    mode: AuthMode,
    step: OnboardingStep,
    signup: Option<SignupInfo>,
    code: String,
    countdown: ResendCountdown,
    error: Option<String>,
    session: Option<Session>,
    profile: Option<Profile>,
}

impl<B: Backend> OnboardingFlow<B> {
    pub fn new(api: HomeeApi<B>, mode: AuthMode) -> Self {
        Self {
            api,
            mode,
            step: OnboardingStep::EmailEntry,
            signup: None,
            code: String::new(),
            countdown: ResendCountdown::default(),
            error: None,
            session: None,
            profile: None,
        }
    }

    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: AuthMode) {
        self.mode = mode;
    }

    pub fn step(&self) -> OnboardingStep {
        self.step
    }

    pub fn signup_info(&self) -> Option<&SignupInfo> {
        self.signup.as_ref()
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn countdown(&self) -> ResendCountdown {
        self.countdown
    }

    /// Message for the inline error slot, if the last operation failed.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    pub fn tick_countdown(&mut self) {
        self.countdown.tick();
    }

    /// Take over countdown ticks applied to the live state while this copy was
    /// busy with an operation. `before` is the countdown when the copy was
    /// taken; if the operation restarted or stopped it, its own value wins.
    pub fn adopt_ticks(&mut self, before: ResendCountdown, live: ResendCountdown) {
        if self.countdown == before {
            self.countdown = live;
        }
    }

    fn fail<T>(&mut self, step: OnboardingStep, err: FlowError) -> Result<T, FlowError> {
        tracing::warn!("Onboarding step {:?} failed: {}", self.step, err);
        self.step = step;
        self.error = Some(err.to_string());
        Err(err)
    }

    fn user_id(&self) -> Result<String, FlowError> {
        self.session
            .as_ref()
            .map(|s| s.user.id.clone())
            .ok_or(FlowError::NotSignedIn)
    }

    /// Normalize `email` and ask the backend to send a code to it.
    pub async fn request_code(&mut self, email: &str) -> Result<OnboardingStep, FlowError> {
        self.error = None;
        let email = match validate_email(email) {
            Ok(email) => email,
            Err(e) => return self.fail(OnboardingStep::EmailEntry, e.into()),
        };

        let create_user = self.mode == AuthMode::Signup;
        if let Err(e) = self.api.send_otp(&email, create_user).await {
            return self.fail(OnboardingStep::EmailEntry, e.into());
        }

        tracing::info!("Sent sign-in code to {}", email);
        self.signup = Some(SignupInfo { email });
        self.code.clear();
        self.countdown.start();
        self.step = OnboardingStep::OtpSent;
        Ok(self.step)
    }

    /// Send another code to the pending email once the cooldown has run out.
    /// Only valid while a code is awaited; after a failed verification the
    /// user starts again from [`request_code`](Self::request_code).
    pub async fn resend_code(&mut self) -> Result<(), FlowError> {
        let email = match (&self.signup, self.step) {
            (Some(signup), OnboardingStep::OtpSent) => signup.email.clone(),
            _ => return Err(FlowError::NoPendingEmail),
        };
        if !self.countdown.can_resend() {
            return Err(FlowError::ResendLocked(self.countdown.remaining()));
        }

        self.error = None;
        let create_user = self.mode == AuthMode::Signup;
        if let Err(e) = self.api.send_otp(&email, create_user).await {
            let step = self.step;
            return self.fail(step, e.into());
        }
        self.countdown.start();
        Ok(())
    }

    /// Record the code field; verification starts by itself once the code
    /// reaches its full length.
    pub async fn input_code(&mut self, code: &str) -> Result<OnboardingStep, FlowError> {
        self.code = code.trim().to_string();
        if validate_otp(&self.code).is_ok() {
            let code = self.code.clone();
            return self.verify_code(&code).await;
        }
        Ok(self.step)
    }

    /// Verify `code`, then pick the next step from a single profile read.
    pub async fn verify_code(&mut self, code: &str) -> Result<OnboardingStep, FlowError> {
        self.error = None;
        if let Err(e) = validate_otp(code) {
            return self.fail(OnboardingStep::EmailEntry, e.into());
        }
        let email = match (&self.signup, self.step) {
            (Some(signup), OnboardingStep::OtpSent) => signup.email.clone(),
            _ => return Err(FlowError::NoPendingEmail),
        };

        self.step = OnboardingStep::Verifying;
        let session = match self.api.verify_otp(&email, code).await {
            Ok(session) => session,
            Err(e) => return self.fail(OnboardingStep::EmailEntry, e.into()),
        };
        self.session = Some(session);
        self.countdown.stop();
        self.code.clear();

        let profile = match self.api.profile_by_email(&email).await {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!("Profile lookup after sign-in failed, treating as new user: {}", e);
                None
            }
        };
        self.step = match &profile {
            None => OnboardingStep::ProfileIncomplete,
            Some(p) if !p.has_avatar() => OnboardingStep::AvatarMissing,
            Some(_) => OnboardingStep::Authenticated,
        };
        self.profile = profile;
        Ok(self.step)
    }

    /// Create the profile row for a freshly verified user.
    pub async fn complete_registration(
        &mut self,
        form: &RegistrationForm,
    ) -> Result<OnboardingStep, FlowError> {
        self.error = None;
        let username = form.username.trim().to_string();
        let name = form.name.trim().to_string();
        let checked = validate_username(&username).and_then(|()| validate_name(&name));
        if let Err(e) = checked {
            return self.fail(OnboardingStep::ProfileIncomplete, e.into());
        }

        let user_id = self.user_id()?;
        let email = match &self.signup {
            Some(signup) => signup.email.clone(),
            None => return Err(FlowError::NoPendingEmail),
        };

        match self.api.username_available(&username, Some(&user_id)).await {
            Ok(true) => {}
            Ok(false) => {
                return self.fail(OnboardingStep::ProfileIncomplete, FlowError::UsernameTaken)
            }
            Err(e) => return self.fail(OnboardingStep::ProfileIncomplete, e.into()),
        }

        let new_profile = NewProfile {
            id: user_id,
            email,
            username,
            name,
        };
        match self.api.create_profile(&new_profile).await {
            Ok(profile) => {
                tracing::info!("Registered profile {}", profile.username);
                self.profile = Some(profile);
                self.step = OnboardingStep::AvatarMissing;
                Ok(self.step)
            }
            Err(e) => self.fail(OnboardingStep::ProfileIncomplete, e.into()),
        }
    }

    /// Upload the chosen avatar and attach it to the profile.
    pub async fn complete_avatar(
        &mut self,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<OnboardingStep, FlowError> {
        self.error = None;
        let user_id = self.user_id()?;

        let url = match self
            .api
            .upload_image(UploadKind::Avatar, &user_id, bytes, content_type)
            .await
        {
            Ok(url) => url,
            Err(e) => return self.fail(OnboardingStep::AvatarMissing, e.into()),
        };
        let update = ProfileUpdate {
            avatar_url: Some(url),
            ..ProfileUpdate::default()
        };
        match self.api.update_profile(&user_id, &update).await {
            Ok(profile) => {
                self.profile = Some(profile);
                self.step = OnboardingStep::Authenticated;
                Ok(self.step)
            }
            Err(e) => self.fail(OnboardingStep::AvatarMissing, e.into()),
        }
    }

    pub fn skip_avatar(&mut self) -> OnboardingStep {
        if self.step == OnboardingStep::AvatarMissing {
            self.error = None;
            self.step = OnboardingStep::Authenticated;
        }
        self.step
    }

    pub async fn sign_out(&mut self) -> Result<(), FlowError> {
        let result = self.api.sign_out().await;
        self.abandon();
        result.map_err(FlowError::from)
    }

    /// Drop everything collected so far and go back to the email screen.
    pub fn abandon(&mut self) {
        self.step = OnboardingStep::EmailEntry;
        self.signup = None;
        self.code.clear();
        self.countdown.stop();
        self.error = None;
        self.session = None;
        self.profile = None;
    }
}
