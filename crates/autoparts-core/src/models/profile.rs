use std::fmt;

use serde::{Deserialize, Serialize};

use crate::utils::redact;

/// Opaque bearer credential issued at login.
///
/// The raw value is only reachable through [`Token::as_str`]; `Debug` output is
/// redacted so a token can never leak through a log line.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({})", redact(&self.0))
    }
}

/// User profile as returned by `GET /api/profile`.
/// Never persisted; re-fetched after every cold start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct Profile {
    pub username: String,
    pub email: String,
}
