//! Signed-in administrator profile.

use cashper_auth::{AdminProfile, Session};
use serde_json::Value;

use crate::backend::Backend;
use crate::error::ClientError;

pub const PROFILE_ENDPOINT: &str = "/api/auth/me";

/// Fetch the current admin's profile and cache it on the session.
///
/// Returns `Ok(None)` without a request when nobody is signed in. A 401
/// clears the stored token and cached profile before the error is returned.
pub async fn load_profile(
    backend: &dyn Backend,
    session: &Session,
) -> Result<Option<AdminProfile>, ClientError> {
    if !session.is_signed_in() {
        tracing::debug!("no stored token; skipping profile load");
        return Ok(None);
    }

    let body = match backend.get_json(PROFILE_ENDPOINT, &[]).await {
        Ok(body) => body,
        Err(err) => {
            if err.is_unauthorized() {
                session.handle_unauthorized();
            }
            return Err(err);
        }
    };

    let profile: AdminProfile = serde_json::from_value(unwrap_profile(body))
        .map_err(|e| ClientError::Parse(format!("profile: {e}")))?;
    if let Err(err) = session.cache_profile(&profile) {
        tracing::warn!("could not cache profile: {err}");
    }
    tracing::info!(admin = %profile.display_name(), "profile loaded");
    Ok(Some(profile))
}

fn unwrap_profile(body: Value) -> Value {
    match body {
        Value::Object(mut obj) => {
            for key in ["user", "data"] {
                if matches!(obj.get(key), Some(Value::Object(_))) {
                    if let Some(inner) = obj.remove(key) {
                        return inner;
                    }
                }
            }
            Value::Object(obj)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::{Reply, ScriptedBackend};
    use cashper_auth::{DEFAULT_TOKEN_KEY, MemoryTokenStore};
    use serde_json::json;
    use std::sync::Arc;

    fn signed_in() -> Session {
        Session::new(Arc::new(MemoryTokenStore::with_token(DEFAULT_TOKEN_KEY, "tok")))
    }

    #[tokio::test]
    async fn skips_without_token() {
        let backend = ScriptedBackend::new();
        let session = Session::new(Arc::new(MemoryTokenStore::new()));

        assert!(load_profile(&backend, &session).await.unwrap().is_none());
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn loads_and_caches_wrapped_profile() {
        let backend = ScriptedBackend::new();
        backend.reply(
            PROFILE_ENDPOINT,
            Reply::Json(json!({"user": {"_id": "a1", "fullName": "Priya Shah", "role": "admin"}})),
        );
        let session = signed_in();

        let profile = load_profile(&backend, &session).await.unwrap().unwrap();

        assert!(profile.is_admin());
        assert_eq!(profile.display_name(), "Priya Shah");
        assert_eq!(session.cached_profile().unwrap(), Some(profile));
    }

    #[tokio::test]
    async fn unauthorized_clears_session() {
        let backend = ScriptedBackend::new();
        backend.reply(PROFILE_ENDPOINT, Reply::Json(json!({"name": "old"})));
        let session = signed_in();
        load_profile(&backend, &session).await.unwrap();

        let backend = ScriptedBackend::new();
        backend.reply(PROFILE_ENDPOINT, Reply::Status(401, "{\"detail\":\"expired\"}".into()));
        let err = load_profile(&backend, &session).await.unwrap_err();

        assert!(err.is_unauthorized());
        assert!(!session.is_signed_in());
        assert_eq!(session.cached_profile().unwrap(), None);
    }
}
