//! Authentication error types.

use crate::api_client::ApiError;
use thiserror::Error;

/// Message shown when the backend gives no usable reason for a failure.
pub const FALLBACK_MESSAGE: &str = "Something went wrong!";

/// Authentication error type.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Backend refused the credentials, or returned no usable identity
    #[error("Login failed: {0}")]
    LoginRejected(String),

    /// Backend refused the registration form
    #[error("Registration failed: {0}")]
    RegistrationRejected(String),

    /// Password and confirmation differ; caught before any request is sent
    #[error("Passwords do not match")]
    PasswordMismatch,

    /// A newer login attempt or a logout started while this attempt was in flight
    #[error("Login attempt superseded by a newer session change")]
    Superseded,

    /// Operation requires a signed-in session
    #[error("Not logged in")]
    NotLoggedIn,

    /// Request the backend does not offer (unknown resource, unsearchable collection)
    #[error("Unsupported request: {0}")]
    Unsupported(String),

    /// Invalid state transition in the session FSM
    #[error("Invalid session state transition: {0}")]
    InvalidStateTransition(String),

    /// Request pipeline error
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] portal_storage::StorageError),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AuthError {
    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::LoginRejected(msg) | AuthError::RegistrationRejected(msg) => msg.clone(),
            AuthError::Api(e) => e.message(),
            other => other.to_string(),
        }
    }

    /// Returns true if the backend rejected the session's credentials.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, AuthError::Api(e) if e.is_unauthorized())
    }
}

/// Result type alias using AuthError.
pub type AuthResult<T> = Result<T, AuthError>;
