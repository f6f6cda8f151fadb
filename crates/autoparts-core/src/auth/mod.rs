//! Token persistence for the session lifecycle.
//!
//! This module provides:
//! - `SessionStore`: the async trait the session controller writes through
//! - `FileSessionStore`: the token as a single file in the data directory
//! - `KeyringSessionStore`: the token in the OS keychain
//! - `MemorySessionStore`: an in-process store for tests
//!
//! Exactly one token is persisted. Absence means logged out.

pub mod file;
pub mod keychain;
pub mod memory;
pub mod store;

use std::sync::Arc;

use anyhow::Result;

use crate::config::{Config, SessionBackend};

pub use file::FileSessionStore;
pub use keychain::KeyringSessionStore;
pub use memory::{MemorySessionStore, StoreOp};
pub use store::{SessionStore, StorageError};

/// Open the session store selected by the configuration
pub fn open_store(config: &Config) -> Result<Arc<dyn SessionStore>> {
    let store: Arc<dyn SessionStore> = match config.session_backend {
        SessionBackend::File => Arc::new(FileSessionStore::new(config.data_dir()?)),
        SessionBackend::Keyring => Arc::new(KeyringSessionStore::new()?),
    };
    Ok(store)
}
