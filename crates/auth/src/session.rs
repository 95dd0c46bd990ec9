//! Session: the single owner of credential access.

use std::sync::Arc;

use crate::{AdminProfile, AuthError, TokenStore};

/// Fixed storage key for the bearer token.
pub const DEFAULT_TOKEN_KEY: &str = "access_token";

/// Storage key for the cached profile of the signed-in admin.
pub const PROFILE_KEY: &str = "user";

/// Authenticated session shared by every admin screen.
///
/// This struct is cheap to clone and is safe to share across tasks.
#[derive(Clone)]
pub struct Session {
    store: Arc<dyn TokenStore>,
    token_key: String,
}

impl core::fmt::Debug for Session {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Session")
            .field("token_key", &self.token_key)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self::with_token_key(store, DEFAULT_TOKEN_KEY)
    }

    pub fn with_token_key(store: Arc<dyn TokenStore>, token_key: impl Into<String>) -> Self {
        Self {
            store,
            token_key: token_key.into(),
        }
    }

    pub fn token_key(&self) -> &str {
        &self.token_key
    }

    /// Current token, if any. Storage failures are logged and read as "no token".
    pub fn token(&self) -> Option<String> {
        match self.store.load(&self.token_key) {
            Ok(token) => token.filter(|t| !t.trim().is_empty()),
            Err(err) => {
                tracing::warn!("failed to read access token: {err}");
                None
            }
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.token().is_some()
    }

    /// Token for an `Authorization: Bearer` header; missing token is an auth failure.
    pub fn bearer(&self) -> Result<String, AuthError> {
        self.token().ok_or(AuthError::MissingToken)
    }

    /// Persist a freshly issued token.
    pub fn sign_in(&self, token: &str) -> Result<(), AuthError> {
        self.store.save(&self.token_key, token)
    }

    /// Clear token and cached profile.
    pub fn sign_out(&self) -> Result<(), AuthError> {
        self.store.remove(&self.token_key)?;
        self.store.remove(PROFILE_KEY)
    }

    /// React to an HTTP 401: drop stored credentials and cached profile.
    pub fn handle_unauthorized(&self) {
        tracing::warn!("backend rejected access token; clearing stored credentials");
        if let Err(err) = self.sign_out() {
            tracing::error!("failed to clear credentials after 401: {err}");
        }
    }

    pub fn cached_profile(&self) -> Result<Option<AdminProfile>, AuthError> {
        let Some(raw) = self.store.load(PROFILE_KEY)? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| AuthError::InvalidProfile(e.to_string()))
    }

    pub fn cache_profile(&self, profile: &AdminProfile) -> Result<(), AuthError> {
        let raw = serde_json::to_string(profile)
            .map_err(|e| AuthError::InvalidProfile(e.to_string()))?;
        self.store.save(PROFILE_KEY, &raw)
    }
}
