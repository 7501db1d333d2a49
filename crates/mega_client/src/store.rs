//! Encrypted on-disk session blobs.
//!
//! Two files per session (the session record and the filesystem snapshot)
//! live in the system temp directory under names nobody can correlate with
//! an account: `ub64(AES-CBC(PK, SHA-256(username ‖ password ‖ name)))`
//! truncated to 30 characters.
//!
//! Envelope: the payload is prefixed with its own SHA-256 digest and the
//! whole is AES-CTR encrypted under PK with nonce = the first 8 bytes of
//! the path digest. Loads verify the digest prefix; any corruption,
//! mismatch or absence yields `None` — resuming falls back to a fresh
//! login, it never crashes.

use std::fs;
use std::path::PathBuf;

use tracing::{debug, warn};

use mega_crypto::aes::{aes_ctr, aes_enc_cbc};
use mega_crypto::b64::ub64enc;
use mega_crypto::hash::{sha256, sha256_concat};

use crate::error::ClientError;

const NAME_LEN: usize = 30;
const DIGEST_LEN: usize = 32;

pub struct BlobStore {
    pk: [u8; 16],
    username: String,
    password: String,
}

impl BlobStore {
    pub fn new(pk: [u8; 16], username: &str, password: &str) -> Self {
        Self {
            pk,
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    fn digest(&self, name: &str) -> [u8; 32] {
        sha256_concat(&[
            self.username.as_bytes(),
            self.password.as_bytes(),
            name.as_bytes(),
        ])
    }

    fn path(&self, name: &str) -> Result<PathBuf, ClientError> {
        let enc = aes_enc_cbc(&self.pk, &self.digest(name))?;
        let file_name: String = ub64enc(&enc).chars().take(NAME_LEN).collect();
        Ok(std::env::temp_dir().join(file_name))
    }

    /// Write a blob atomically (temp file + rename).
    pub fn save(&self, name: &str, payload: &[u8]) -> Result<(), ClientError> {
        let digest = self.digest(name);
        let nonce: [u8; 8] = digest[..8].try_into().expect("digest is 32 bytes");

        let body_digest = sha256(payload);
        let mut plain = Vec::with_capacity(DIGEST_LEN + payload.len());
        plain.extend_from_slice(&body_digest);
        plain.extend_from_slice(payload);
        let ciphertext = aes_ctr(&self.pk, &nonce, 0, &plain);

        let path = self.path(name)?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, &ciphertext)?;
        fs::rename(&tmp, &path)?;
        debug!(blob = name, bytes = payload.len(), "session blob written");
        Ok(())
    }

    /// Read and verify a blob. `None` for anything other than an intact file.
    pub fn load(&self, name: &str) -> Option<Vec<u8>> {
        let path = self.path(name).ok()?;
        let ciphertext = fs::read(&path).ok()?;

        let digest = self.digest(name);
        let nonce: [u8; 8] = digest[..8].try_into().expect("digest is 32 bytes");
        let plain = aes_ctr(&self.pk, &nonce, 0, &ciphertext);

        if plain.len() < DIGEST_LEN {
            warn!(blob = name, "session blob too short, ignoring");
            return None;
        }
        let (prefix, body) = plain.split_at(DIGEST_LEN);
        if sha256(body) != prefix {
            warn!(blob = name, "session blob failed integrity check, ignoring");
            return None;
        }
        Some(body.to_vec())
    }

    pub fn remove(&self, name: &str) {
        if let Ok(path) = self.path(name) {
            let _ = fs::remove_file(path);
        }
    }
}
