use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::{SessionStore, StorageError};
use crate::models::Token;

/// Token file name in the data directory
const TOKEN_FILE: &str = "token";

/// Temporary file the token is staged in before the atomic rename
const TOKEN_TEMP_FILE: &str = "token.tmp";

/// Stores the raw token string in `<dir>/token`.
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(TOKEN_FILE)
    }

    fn temp_path(&self) -> PathBuf {
        self.dir.join(TOKEN_TEMP_FILE)
    }

    async fn write_synced(path: &Path, contents: &str) -> Result<(), StorageError> {
        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options
            .open(path)
            .await
            .map_err(|e| StorageError::io(path, e))?;
        file.write_all(contents.as_bytes())
            .await
            .map_err(|e| StorageError::io(path, e))?;
        file.flush().await.map_err(|e| StorageError::io(path, e))?;
        file.sync_all().await.map_err(|e| StorageError::io(path, e))?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn save(&self, token: &Token) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StorageError::io(&self.dir, e))?;

        let temp = self.temp_path();
        let path = self.path();

        let mut result = Self::write_synced(&temp, token.as_str()).await;
        if result.is_ok() {
            result = fs::rename(&temp, &path)
                .await
                .map_err(|e| StorageError::io(&path, e));
        }
        if result.is_err() {
            // Leave no staged token behind; the key itself was never touched
            let _ = fs::remove_file(&temp).await;
        }

        if result.is_ok() {
            debug!(path = %path.display(), "Session token saved");
        }
        result
    }

    async fn load(&self) -> Result<Option<Token>, StorageError> {
        let path = self.path();
        match fs::read_to_string(&path).await {
            // Blank means empty; anything else is returned exactly as saved
            Ok(contents) if contents.trim().is_empty() => Ok(None),
            Ok(contents) => Ok(Some(Token::new(contents))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::io(path, e)),
        }
    }

    async fn clear(&self) -> Result<(), StorageError> {
        let path = self.path();
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = %path.display(), "Session token cleared");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(path, e)),
        }
    }

    fn backend(&self) -> &'static str {
        "file"
    }
}
