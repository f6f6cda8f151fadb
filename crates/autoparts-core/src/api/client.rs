//! API client for the Auto Parts authentication and profile endpoints.
//!
//! Every call is attempted exactly once. Retry policy, if any, belongs to
//! the caller; this boundary only translates transport exchanges into typed
//! results.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{header, Client, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::Config;
use crate::models::{Credentials, NewAccount, Profile, Token};
use crate::utils::truncate_body;

use super::error::Endpoint;
use super::AuthError;

// ============================================================================
// Constants
// ============================================================================

pub const LOGIN_PATH: &str = "/api/auth/login";
pub const REGISTER_PATH: &str = "/api/auth/register";
pub const PROFILE_PATH: &str = "/api/profile";

/// HTTP request timeout in seconds.
/// 30s allows for slow mobile networks while failing fast enough for good UX.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

const INVALID_RESPONSE_MESSAGE: &str = "Invalid response from server";

/// Every successful payload arrives wrapped as `{"data": ...}`
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct LoginData {
    token: Option<String>,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    username: &'a str,
    email: &'a str,
    password: &'a str,
}

/// Stateless client for the auth endpoints.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone, Debug)]
pub struct AuthClient {
    client: Client,
    base_url: String,
}

impl AuthClient {
    /// Create a new client against `base_url` with the default timeout
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
    }

    /// Create a new client with an explicit transport timeout
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    /// Create a client from the configured base URL and timeout
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::with_timeout(config.api_url.clone(), config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Exchange credentials for a token
    pub async fn login(&self, credentials: &Credentials) -> Result<Token, AuthError> {
        let url = self.url(LOGIN_PATH);
        debug!(url = %url, username = %credentials.username, "Sending login request");

        let body = LoginRequest {
            username: credentials.username.trim(),
            password: &credentials.password,
        };
        let response = self
            .client
            .post(&url)
            .header(header::ACCEPT, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(AuthError::from_transport)?;

        let response = Self::check_response(response, Endpoint::Login).await?;
        let envelope: Envelope<LoginData> = Self::parse_json(response, LOGIN_PATH).await?;

        envelope
            .data
            .and_then(|d| d.token)
            .filter(|t| !t.is_empty())
            .map(Token::new)
            .ok_or_else(|| {
                warn!(url = %url, "Login response did not contain a token");
                AuthError::ServerError(INVALID_RESPONSE_MESSAGE.to_string())
            })
    }

    /// Create an account. Success carries no payload.
    pub async fn register(&self, account: &NewAccount) -> Result<(), AuthError> {
        let url = self.url(REGISTER_PATH);
        debug!(url = %url, username = %account.username, "Sending register request");

        let body = RegisterRequest {
            username: account.username.trim(),
            email: account.email.trim(),
            password: &account.password,
        };
        let response = self
            .client
            .post(&url)
            .header(header::ACCEPT, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(AuthError::from_transport)?;

        Self::check_response(response, Endpoint::Register).await?;
        Ok(())
    }

    /// Fetch the profile of the user the token belongs to.
    /// A 401 here means the token is stale and comes back as `SessionInvalid`.
    pub async fn fetch_profile(&self, token: &Token) -> Result<Profile, AuthError> {
        let url = self.url(PROFILE_PATH);
        debug!(url = %url, token = ?token, "Fetching profile");

        let response = self
            .client
            .get(&url)
            .header(header::ACCEPT, "application/json")
            .bearer_auth(token.as_str())
            .send()
            .await
            .map_err(AuthError::from_transport)?;

        let response = Self::check_response(response, Endpoint::Profile).await?;
        let envelope: Envelope<Profile> = Self::parse_json(response, PROFILE_PATH).await?;

        envelope.data.ok_or_else(|| {
            warn!(url = %url, "Profile response did not contain data");
            AuthError::ServerError(INVALID_RESPONSE_MESSAGE.to_string())
        })
    }

    /// Check if response is successful, classifying the failure if not.
    async fn check_response(response: Response, endpoint: Endpoint) -> Result<Response, AuthError> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        warn!(
            endpoint = ?endpoint,
            status = status.as_u16(),
            body = %truncate_body(&body),
            "Request rejected"
        );
        Err(AuthError::from_status(status, &body, endpoint))
    }

    async fn parse_json<T: DeserializeOwned>(response: Response, path: &str) -> Result<T, AuthError> {
        let text = response.text().await.map_err(AuthError::from_transport)?;
        serde_json::from_str(&text).map_err(|e| {
            warn!(path = path, error = %e, body = %truncate_body(&text), "Failed to parse response");
            AuthError::ServerError(INVALID_RESPONSE_MESSAGE.to_string())
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
