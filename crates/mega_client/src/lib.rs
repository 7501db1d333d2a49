//! mega_client — sessions, transaction engine, and filesystem for the
//! encrypted cloud-storage service
//!
//! # Module layout
//! - `session`   — credential handling, login/resume state machine, account
//!                 lifecycle RPCs, exported-folder mode
//! - `api`       — batched JSON transaction engine with call-id sequencing
//!                 and busy/no-response backoff
//! - `fs`        — filesystem materialiser: share keys, node import, paths
//! - `store`     — encrypted on-disk session blobs
//! - `transport` — HTTP seam (reqwest/rustls in production)
//! - `config`    — client tunables
//! - `error`     — unified error type
//!
//! A `Session` owns its engine, its snapshot, and its two blobs; two
//! sessions never share state.

pub mod api;
pub mod config;
pub mod error;
pub mod fs;
pub mod session;
pub mod store;
pub mod transport;

pub use api::{Api, SidParam};
pub use config::ClientConfig;
pub use error::ClientError;
pub use fs::{FileSystem, Node, NodeKind, NETWORK_HANDLE, TOP_HANDLE};
pub use session::{is_ephemeral, Session, SessionRecord};
pub use transport::{HttpTransport, Transport, TransportError, TransportErrorKind};
