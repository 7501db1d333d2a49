//! Session proofs and key unwrapping.
//!
//! - TSID: a self-authenticating blob whose last 16 bytes are the AES-ECB
//!   encryption of its first 16 under the master key.
//! - CSID: an RSA-encrypted challenge whose decryption yields the session id.
//! - Node keys: the `k` field of a node is a sequence of
//!   `<ownerHandle>:<ciphertext>` pairs; the unwrapping key is the master
//!   key for our own handle and the installed share key otherwise.

use std::collections::HashMap;

use mega_crypto::aes::{aes_dec, aes_enc_block};
use mega_crypto::b64::{ub64dec, ub64enc};
use mega_crypto::buf::{random_key, unpack_file_key};
use mega_crypto::rsa::RsaPrivate;

use crate::error::ProtoError;

/// Validate a temporary session id against the master key.
pub fn tsid_valid(mk: &[u8; 16], tsid: &str) -> bool {
    let Ok(bytes) = ub64dec(tsid) else {
        return false;
    };
    if bytes.len() < 32 {
        return false;
    }
    let ts1: [u8; 16] = bytes[..16].try_into().expect("length checked");
    let ts2a = &bytes[bytes.len() - 16..];
    aes_enc_block(mk, &ts1) == *ts2a
}

/// Build the session-proof blob sent at registration and account reset:
/// 16 random bytes followed by their AES-ECB encryption under the master
/// key. Registration and reset must stay bit-compatible, so both call this.
pub fn make_ts_blob(mk: &[u8; 16]) -> Vec<u8> {
    let ts1 = random_key();
    let ts2 = aes_enc_block(mk, &ts1);
    let mut out = Vec::with_capacity(32);
    out.extend_from_slice(&ts1);
    out.extend_from_slice(&ts2);
    out
}

/// Decrypt a challenge session id into the url-base64 sid string.
pub fn decrypt_csid(privk: &RsaPrivate, csid: &str) -> Result<String, ProtoError> {
    let ct = ub64dec(csid)?;
    let sid = privk.decrypt_sid(&ct)?;
    Ok(ub64enc(&sid))
}

// ── Node keys ─────────────────────────────────────────────────────────────────

/// A decrypted per-node key. Files carry the 32-byte packed form plus its
/// 16-byte fold; everything else uses a plain 16-byte key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKey {
    Folder([u8; 16]),
    File { full: [u8; 32], folded: [u8; 16] },
}

impl NodeKey {
    /// The 16-byte key that decrypts this node's attribute blob.
    pub fn attr_key(&self) -> &[u8; 16] {
        match self {
            NodeKey::Folder(k) => k,
            NodeKey::File { folded, .. } => folded,
        }
    }

    pub fn full_key(&self) -> Option<&[u8; 32]> {
        match self {
            NodeKey::Folder(_) => None,
            NodeKey::File { full, .. } => Some(full),
        }
    }
}

/// Unwrap a node key from its `k` field.
///
/// Each `<owner>:<ciphertext>` pair is tried in order and the first pair
/// with a resolvable owner key wins; later pairs are not consulted. Returns
/// `None` when no pair resolves or the decrypted length is neither 16 nor
/// 32 bytes.
pub fn unwrap_node_key(
    k_field: &str,
    own_handle: &str,
    mk: &[u8; 16],
    share_keys: &HashMap<String, [u8; 16]>,
) -> Option<NodeKey> {
    for pair in k_field.split('/') {
        let Some((owner, ct_b64)) = pair.split_once(':') else {
            continue;
        };
        let key = if owner == own_handle {
            mk
        } else {
            match share_keys.get(owner) {
                Some(k) => k,
                None => continue,
            }
        };
        let Ok(ct) = ub64dec(ct_b64) else {
            continue;
        };
        let Ok(plain) = aes_dec(key, &ct) else {
            continue;
        };
        match plain.len() {
            16 => {
                let k: [u8; 16] = plain.as_slice().try_into().expect("length checked");
                return Some(NodeKey::Folder(k));
            }
            32 => {
                let full: [u8; 32] = plain.as_slice().try_into().expect("length checked");
                return Some(NodeKey::File {
                    folded: unpack_file_key(&full),
                    full,
                });
            }
            _ => continue,
        }
    }
    None
}
