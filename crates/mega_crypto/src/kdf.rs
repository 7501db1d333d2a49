//! Key derivation.
//!
//! `aes_key_from_password` — the service's iterated-AES stretch, deriving
//!   the 16-byte password key (PK) that wraps the master key.
//!
//! `make_username_hash` — AES-based MAC of the lowercased email under PK,
//!   sent with named-account logins.
//!
//! Both are fixed by the remote service; identical inputs must produce
//! identical output on every platform.

use zeroize::ZeroizeOnDrop;

use crate::aes::aes_enc_block;
use crate::b64::ub64enc;

/// Seed block for the password stretch, fixed by the protocol.
const PASSWORD_SEED: [u8; 16] = [
    0x93, 0xC4, 0x67, 0xE3, 0x7D, 0xB0, 0xC7, 0xA4, 0xD1, 0xBE, 0x3F, 0x81, 0x01, 0x52, 0xCB, 0x56,
];

const PASSWORD_ROUNDS: usize = 65536;
const USERNAME_HASH_ROUNDS: usize = 16384;

/// 16-byte password key. Zeroized on drop.
#[derive(Clone, ZeroizeOnDrop)]
pub struct PasswordKey(pub [u8; 16]);

/// Derive the password key: 65536 rounds, each round encrypting the running
/// key under every 16-byte zero-padded password chunk in turn.
pub fn aes_key_from_password(password: &str) -> PasswordKey {
    let bytes = password.as_bytes();
    let mut key = PASSWORD_SEED;
    for _ in 0..PASSWORD_ROUNDS {
        for chunk in bytes.chunks(16) {
            let mut round_key = [0u8; 16];
            round_key[..chunk.len()].copy_from_slice(chunk);
            key = aes_enc_block(&round_key, &key);
        }
    }
    PasswordKey(key)
}

/// Hash the lowercased email under PK: XOR-fold the bytes into one block,
/// encrypt 16384 times, emit bytes 0..4 and 8..12 as url-base64 (11 chars).
pub fn make_username_hash(pk: &[u8; 16], email: &str) -> String {
    let lowered = email.to_lowercase();
    let mut h = [0u8; 16];
    for (i, b) in lowered.bytes().enumerate() {
        h[i % 16] ^= b;
    }
    for _ in 0..USERNAME_HASH_ROUNDS {
        h = aes_enc_block(pk, &h);
    }
    let mut out = [0u8; 8];
    out[..4].copy_from_slice(&h[0..4]);
    out[4..].copy_from_slice(&h[8..12]);
    ub64enc(&out)
}
