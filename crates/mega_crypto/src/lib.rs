//! mega_crypto — cryptographic primitives for the cloud-storage client
//!
//! # Design principles
//! - NO custom crypto; primitives come from audited Rust crates. The modes
//!   and framings (zero-IV CBC, unpadded RSA, MPI wire form) are fixed by
//!   the remote service and implemented exactly.
//! - Secret-bearing derivation output is zeroized on drop.
//!
//! # Module layout
//! - `aes`   — AES-128 ECB / zero-IV CBC / CTR
//! - `kdf`   — password→key stretch + username hash
//! - `rsa`   — MPI wire form, unpadded RSA, keypair generation
//! - `hash`  — SHA-256 utilities
//! - `b64`   — URL-safe unpadded base64
//! - `buf`   — alignment, randomness, file-key fold
//! - `error` — unified error type

pub mod aes;
pub mod b64;
pub mod buf;
pub mod error;
pub mod hash;
pub mod kdf;
pub mod rsa;

pub use error::CryptoError;
