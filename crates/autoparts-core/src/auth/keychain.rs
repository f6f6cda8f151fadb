use std::sync::Arc;

use async_trait::async_trait;
use keyring::Entry;
use tracing::debug;

use super::{SessionStore, StorageError};
use crate::models::Token;

const SERVICE_NAME: &str = "autoparts";

/// Keychain account the token is filed under
const TOKEN_ACCOUNT: &str = "session-token";

/// Stores the token in the OS keychain (macOS Keychain, Windows Credential
/// Manager, Linux kernel keyutils).
///
/// Keychain calls block, so each one runs on tokio's blocking pool. On Linux
/// the token lives in the session keyring and lasts for the login session.
pub struct KeyringSessionStore {
    service: String,
    entry: Arc<Entry>,
}

impl KeyringSessionStore {
    pub fn new() -> Result<Self, StorageError> {
        Self::with_names(SERVICE_NAME, TOKEN_ACCOUNT)
    }

    pub fn with_names(service: &str, account: &str) -> Result<Self, StorageError> {
        let entry = Entry::new(service, account)?;
        Ok(Self {
            service: service.to_string(),
            entry: Arc::new(entry),
        })
    }

    async fn run<T, F>(&self, op: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&Entry) -> keyring::Result<T> + Send + 'static,
    {
        let entry = Arc::clone(&self.entry);
        let result = tokio::task::spawn_blocking(move || op(&entry))
            .await
            .map_err(|e| StorageError::Task(e.to_string()))?;
        Ok(result?)
    }
}

#[async_trait]
impl SessionStore for KeyringSessionStore {
    async fn save(&self, token: &Token) -> Result<(), StorageError> {
        let value = token.as_str().to_string();
        self.run(move |entry| entry.set_password(&value)).await?;
        debug!(service = %self.service, "Session token stored in keychain");
        Ok(())
    }

    async fn load(&self) -> Result<Option<Token>, StorageError> {
        self.run(|entry| match entry.get_password() {
            Ok(value) if value.is_empty() => Ok(None),
            Ok(value) => Ok(Some(Token::new(value))),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e),
        })
        .await
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.run(|entry| match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e),
        })
        .await?;
        debug!(service = %self.service, "Session token removed from keychain");
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "keyring"
    }
}
