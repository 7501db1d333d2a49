//! AES-128 in the three modes the service uses.
//!
//! - ECB over aligned buffers — key wrapping only (16- and 32-byte keys,
//!   session proofs). Never used for bulk data.
//! - CBC with a zero IV and no padding — attribute blobs. The service fixes
//!   the IV at zero and pre-aligns the plaintext, so the chaining loop runs
//!   directly over the block cipher.
//! - CTR with an 8-byte nonce and a big-endian 64-bit counter — the local
//!   session-blob envelope.

use aes::cipher::{generic_array::GenericArray, BlockDecrypt, BlockEncrypt, KeyInit};
use aes::Aes128;
use ctr::cipher::{KeyIvInit, StreamCipher};

use crate::error::CryptoError;

type Aes128Ctr = ctr::Ctr128BE<Aes128>;

/// Encrypt a single 16-byte block (ECB).
pub fn aes_enc_block(key: &[u8; 16], block: &[u8; 16]) -> [u8; 16] {
    let cipher = Aes128::new(key.into());
    let mut b = GenericArray::clone_from_slice(block);
    cipher.encrypt_block(&mut b);
    b.into()
}

/// Decrypt a single 16-byte block (ECB).
pub fn aes_dec_block(key: &[u8; 16], block: &[u8; 16]) -> [u8; 16] {
    let cipher = Aes128::new(key.into());
    let mut b = GenericArray::clone_from_slice(block);
    cipher.decrypt_block(&mut b);
    b.into()
}

/// ECB-encrypt an aligned buffer block by block.
pub fn aes_enc(key: &[u8; 16], data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if data.len() % 16 != 0 {
        return Err(CryptoError::Misaligned(data.len()));
    }
    let cipher = Aes128::new(key.into());
    let mut out = data.to_vec();
    for chunk in out.chunks_exact_mut(16) {
        cipher.encrypt_block(GenericArray::from_mut_slice(chunk));
    }
    Ok(out)
}

/// ECB-decrypt an aligned buffer block by block.
pub fn aes_dec(key: &[u8; 16], data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if data.len() % 16 != 0 {
        return Err(CryptoError::Misaligned(data.len()));
    }
    let cipher = Aes128::new(key.into());
    let mut out = data.to_vec();
    for chunk in out.chunks_exact_mut(16) {
        cipher.decrypt_block(GenericArray::from_mut_slice(chunk));
    }
    Ok(out)
}

/// CBC-encrypt with a zero IV. Input must already be 16-byte aligned.
pub fn aes_enc_cbc(key: &[u8; 16], data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if data.len() % 16 != 0 {
        return Err(CryptoError::Misaligned(data.len()));
    }
    let cipher = Aes128::new(key.into());
    let mut out = Vec::with_capacity(data.len());
    let mut prev = [0u8; 16];
    for chunk in data.chunks_exact(16) {
        let mut block = [0u8; 16];
        for i in 0..16 {
            block[i] = chunk[i] ^ prev[i];
        }
        let mut b = GenericArray::from(block);
        cipher.encrypt_block(&mut b);
        prev.copy_from_slice(&b);
        out.extend_from_slice(&b);
    }
    Ok(out)
}

/// CBC-decrypt with a zero IV. Input must be 16-byte aligned.
pub fn aes_dec_cbc(key: &[u8; 16], data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if data.len() % 16 != 0 {
        return Err(CryptoError::Misaligned(data.len()));
    }
    let cipher = Aes128::new(key.into());
    let mut out = Vec::with_capacity(data.len());
    let mut prev = [0u8; 16];
    for chunk in data.chunks_exact(16) {
        let saved: [u8; 16] = chunk.try_into().expect("chunks_exact yields 16 bytes");
        let mut b = GenericArray::clone_from_slice(chunk);
        cipher.decrypt_block(&mut b);
        for i in 0..16 {
            out.push(b[i] ^ prev[i]);
        }
        prev = saved;
    }
    Ok(out)
}

/// CTR transform (encrypt == decrypt) with counter block `nonce ‖ counter_be64`.
pub fn aes_ctr(key: &[u8; 16], nonce: &[u8; 8], counter: u64, data: &[u8]) -> Vec<u8> {
    let mut iv = [0u8; 16];
    iv[..8].copy_from_slice(nonce);
    iv[8..].copy_from_slice(&counter.to_be_bytes());
    let mut cipher = Aes128Ctr::new(key.into(), &iv.into());
    let mut out = data.to_vec();
    cipher.apply_keystream(&mut out);
    out
}
