//! File-backed credential storage.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use cashper_auth::{AuthError, TokenStore};

/// JSON file holding the persisted session keys (`access_token`, `user`).
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// `<config dir>/cashper/session.json`.
    pub fn default_location() -> Result<Self, AuthError> {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
            .ok_or_else(|| {
                AuthError::Storage(
                    "failed to resolve OS config directory - tried config_dir() and home_dir()/.config"
                        .to_string(),
                )
            })?;
        Ok(Self::new(base.join("cashper").join("session.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, AuthError> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| {
                AuthError::Storage(format!("corrupt session file {:?}: {e}", self.path))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(AuthError::Storage(format!(
                "failed to read session file {:?}: {e}",
                self.path
            ))),
        }
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), AuthError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AuthError::Storage(format!("failed to create session directory at {parent:?}: {e}"))
            })?;
        }
        let raw = serde_json::to_string_pretty(entries)
            .map_err(|e| AuthError::Storage(e.to_string()))?;
        std::fs::write(&self.path, raw).map_err(|e| {
            AuthError::Storage(format!("failed to write session file {:?}: {e}", self.path))
        })
    }

    fn update<F>(&self, f: F) -> Result<(), AuthError>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| AuthError::Storage("session file lock poisoned".to_string()))?;
        let mut entries = self.read_all()?;
        f(&mut entries);
        self.write_all(&entries)
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self, key: &str) -> Result<Option<String>, AuthError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| AuthError::Storage("session file lock poisoned".to_string()))?;
        Ok(self.read_all()?.remove(key))
    }

    fn save(&self, key: &str, value: &str) -> Result<(), AuthError> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<(), AuthError> {
        self.update(|entries| {
            entries.remove(key);
        })
    }
}
