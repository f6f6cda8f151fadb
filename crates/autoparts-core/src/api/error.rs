use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use crate::auth::StorageError;
use crate::utils::truncate_body;

/// Fallback shown when the server gives no message of its own
pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred";

/// Shown after a stored token is rejected by the profile endpoint
pub const SESSION_EXPIRED_MESSAGE: &str = "session expired";

const NETWORK_UNAVAILABLE_MESSAGE: &str =
    "Unable to connect to server. Check your internet connection.";

#[derive(Error, Debug)]
pub enum AuthError {
    /// Empty or malformed client input, caught before any request
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Login or register rejected by the server (4xx)
    #[error("Rejected by server: {0}")]
    InvalidCredentials(String),

    /// A previously accepted token was rejected (401 on a protected endpoint)
    #[error("Unauthorized - session token rejected")]
    SessionInvalid,

    #[error("Network unavailable: {0}")]
    NetworkUnavailable(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Intent rejected because a guard state is active
    #[error("A {0} is already in progress")]
    Busy(&'static str),

    #[error("Already logged in")]
    AlreadyLoggedIn,

    #[error("Not logged in")]
    NotAuthenticated,
}

/// Which endpoint produced a non-success status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Endpoint {
    Login,
    Register,
    Profile,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl AuthError {
    /// Extract `{"message": "..."}` from an error body, if present and non-empty
    pub(crate) fn server_message(body: &str) -> Option<String> {
        serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.message)
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
    }

    pub(crate) fn from_status(status: StatusCode, body: &str, endpoint: Endpoint) -> Self {
        let message = Self::server_message(body).unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_string());
        match (status.as_u16(), endpoint) {
            (401, Endpoint::Profile) => AuthError::SessionInvalid,
            (400..=499, Endpoint::Login | Endpoint::Register) => {
                AuthError::InvalidCredentials(message)
            }
            (500..=599, _) => AuthError::ServerError(message),
            (400..=499, Endpoint::Profile) => AuthError::ServerError(message),
            _ => AuthError::ServerError(format!(
                "Unexpected status {}: {}",
                status,
                truncate_body(body)
            )),
        }
    }

    /// Classify a transport failure. No response reached us, so this is
    /// always a connectivity problem from the caller's point of view.
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AuthError::NetworkUnavailable(format!("request timed out: {}", err))
        } else {
            AuthError::NetworkUnavailable(err.to_string())
        }
    }

    /// Text suitable for showing to the user on the initiating screen
    pub fn user_message(&self) -> String {
        match self {
            AuthError::Validation(message)
            | AuthError::InvalidCredentials(message)
            | AuthError::ServerError(message) => message.clone(),
            AuthError::SessionInvalid => SESSION_EXPIRED_MESSAGE.to_string(),
            AuthError::NetworkUnavailable(_) => NETWORK_UNAVAILABLE_MESSAGE.to_string(),
            AuthError::Storage(_) => "Unable to access session storage on this device".to_string(),
            AuthError::Busy(what) => format!("A {} is already in progress", what),
            AuthError::AlreadyLoggedIn => "Already logged in".to_string(),
            AuthError::NotAuthenticated => "Please log in to continue".to_string(),
        }
    }

    pub fn is_session_invalid(&self) -> bool {
        matches!(self, AuthError::SessionInvalid)
    }
}
