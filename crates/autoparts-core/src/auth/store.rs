use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::Token;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Keychain error: {0}")]
    Keyring(#[from] ::keyring::Error),

    #[error("Storage task failed: {0}")]
    Task(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Durable persistence of the single session token.
///
/// Each operation resolves only once the medium has committed (or failed);
/// a failed `save` never leaves a partially written token behind.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist the token, replacing any previous value
    async fn save(&self, token: &Token) -> Result<(), StorageError>;

    /// Return the persisted token, or `None` if nothing is stored
    async fn load(&self) -> Result<Option<Token>, StorageError>;

    /// Remove the stored token. Succeeds when nothing was stored.
    async fn clear(&self) -> Result<(), StorageError>;

    /// Short backend name for log lines
    fn backend(&self) -> &'static str;
}
