//! mega_proto — protocol types and codecs shared by the client layers
//!
//! # Module layout
//! - `api`       — JSON request/response shapes for the `/cs` endpoint
//! - `attrs`     — encrypted node-attribute codec
//! - `handshake` — TSID/CSID session proofs + node-key unwrapping
//! - `error`     — service error taxonomy and codec errors

pub mod api;
pub mod attrs;
pub mod error;
pub mod handshake;

pub use error::{ProtoError, ServiceError};
