//! `cashper-auth`: session collaborator for the admin console.
//!
//! Token retrieval and 401 handling live behind one injected `Session` so that
//! every admin screen sees the same expiry behavior. This crate is
//! intentionally decoupled from HTTP; persistent storage is pluggable via
//! `TokenStore`.

pub mod error;
pub mod profile;
pub mod session;
pub mod store;

pub use error::AuthError;
pub use profile::AdminProfile;
pub use session::{Session, DEFAULT_TOKEN_KEY, PROFILE_KEY};
pub use store::{MemoryTokenStore, TokenStore};
