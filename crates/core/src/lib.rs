//! `cashper-core`: domain building blocks for the Cashper admin console.
//!
//! This crate contains **pure domain** primitives (no HTTP, no storage): entity
//! identifiers, the `Entity` abstraction every admin resource record satisfies,
//! and per-resource status policies.

pub mod entity;
pub mod error;
pub mod id;
pub mod status;

pub use entity::{Entity, Record};
pub use error::{DomainError, DomainResult};
pub use id::EntityId;
pub use status::{NormalizedStatus, StatusPolicy};
