use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No bearer token is stored for this session.
    #[error("not signed in: no access token found")]
    MissingToken,

    /// The backend rejected the token (HTTP 401).
    #[error("session expired or token rejected")]
    Unauthorized,

    /// The token store could not be read or written.
    #[error("token storage error: {0}")]
    Storage(String),

    /// A cached profile could not be decoded.
    #[error("invalid cached profile: {0}")]
    InvalidProfile(String),
}
