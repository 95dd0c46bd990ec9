//! Persistent client-side key/value storage for credentials.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::AuthError;

/// Client storage for the bearer token and cached profile.
///
/// Implementations must be cheap to call; the session reads the token on
/// every request.
pub trait TokenStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>, AuthError>;
    fn save(&self, key: &str, value: &str) -> Result<(), AuthError>;
    fn remove(&self, key: &str) -> Result<(), AuthError>;
}

/// In-process store (tests, ephemeral sessions).
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    inner: Mutex<HashMap<String, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a token under `key`.
    pub fn with_token(key: &str, token: &str) -> Self {
        let store = Self::new();
        if let Ok(mut guard) = store.inner.lock() {
            guard.insert(key.to_string(), token.to_string());
        }
        store
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self, key: &str) -> Result<Option<String>, AuthError> {
        let guard = self
            .inner
            .lock()
            .map_err(|_| AuthError::Storage("memory store poisoned".to_string()))?;
        Ok(guard.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<(), AuthError> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| AuthError::Storage("memory store poisoned".to_string()))?;
        guard.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), AuthError> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| AuthError::Storage("memory store poisoned".to_string()))?;
        guard.remove(key);
        Ok(())
    }
}
