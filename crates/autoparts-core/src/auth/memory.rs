use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{SessionStore, StorageError};
use crate::models::Token;

/// One recorded store operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    Save(String),
    Load,
    Clear,
}

#[derive(Default)]
struct MemoryInner {
    token: Option<Token>,
    ops: Vec<StoreOp>,
}

/// In-process store for tests and previews.
///
/// Records every operation in order and can be told to fail reads or writes.
#[derive(Default)]
pub struct MemorySessionStore {
    inner: Mutex<MemoryInner>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds a token, as if persisted by a previous run
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            inner: Mutex::new(MemoryInner {
                token: Some(Token::new(token)),
                ops: Vec::new(),
            }),
            ..Self::default()
        }
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Current token, without recording an operation
    pub async fn peek(&self) -> Option<Token> {
        self.inner.lock().await.token.clone()
    }

    /// Operations performed so far, oldest first
    pub async fn ops(&self) -> Vec<StoreOp> {
        self.inner.lock().await.ops.clone()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn save(&self, token: &Token) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().await;
        inner.ops.push(StoreOp::Save(token.as_str().to_string()));
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("write rejected".to_string()));
        }
        inner.token = Some(token.clone());
        Ok(())
    }

    async fn load(&self) -> Result<Option<Token>, StorageError> {
        let mut inner = self.inner.lock().await;
        inner.ops.push(StoreOp::Load);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("read rejected".to_string()));
        }
        Ok(inner.token.clone())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().await;
        inner.ops.push(StoreOp::Clear);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("write rejected".to_string()));
        }
        inner.token = None;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
