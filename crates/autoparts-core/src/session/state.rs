use serde::Serialize;

use crate::models::{Profile, Token};

/// Current authentication state.
///
/// `Authenticating` and `LoggingOut` are guard states: while one is active,
/// intents of the same kind are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    LoggedOut,
    Authenticating,
    LoggedIn {
        token: Token,
        profile: Option<Profile>,
    },
    LoggingOut,
}

/// State tag without payload, for logs and display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub enum StateTag {
    LoggedOut,
    Authenticating,
    LoggedIn,
    LoggingOut,
}

/// Serializable summary of the session. Never carries the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct SessionStatus {
    pub state: StateTag,
    pub profile: Option<Profile>,
}

impl SessionState {
    pub fn tag(&self) -> StateTag {
        match self {
            SessionState::LoggedOut => StateTag::LoggedOut,
            SessionState::Authenticating => StateTag::Authenticating,
            SessionState::LoggedIn { .. } => StateTag::LoggedIn,
            SessionState::LoggingOut => StateTag::LoggingOut,
        }
    }

    /// Get the bearer token if logged in
    pub fn token(&self) -> Option<&Token> {
        match self {
            SessionState::LoggedIn { token, .. } => Some(token),
            _ => None,
        }
    }

    /// Get the fetched profile, if any
    pub fn profile(&self) -> Option<&Profile> {
        match self {
            SessionState::LoggedIn { profile, .. } => profile.as_ref(),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::LoggedIn { .. })
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            state: self.tag(),
            profile: self.profile().cloned(),
        }
    }
}
