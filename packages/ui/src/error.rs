//! Errors surfaced to the user by the client flows.

use api::{ApiError, LinkError};
use store::StoreError;
use thiserror::Error;

/// Client-side input problems, shown inline next to the field.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Enter a valid email address")]
    InvalidEmail,
    #[error("Usernames are 3-20 characters: lowercase letters, digits, '_' or '.'")]
    InvalidUsername,
    #[error("Name must be between 1 and 50 characters")]
    InvalidName,
    #[error("Password must be at least 8 characters")]
    WeakPassword,
    #[error("The code is 6 characters long")]
    InvalidCode,
}

#[derive(Debug, Error)]
pub enum FlowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Remote(#[from] ApiError),

    #[error(transparent)]
    Link(#[from] LinkError),

    #[error("could not save locally: {0}")]
    Local(#[from] StoreError),

    #[error("no email address is waiting for a code")]
    NoPendingEmail,

    #[error("you can request a new code in {0}s")]
    ResendLocked(u32),

    #[error("that username is already taken")]
    UsernameTaken,

    #[error("not signed in")]
    NotSignedIn,

    #[error("profile not found")]
    ProfileNotFound,

    #[error("you cannot connect with yourself")]
    SelfConnection,
}
