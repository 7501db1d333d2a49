//! Byte-buffer helpers shared by the protocol layers.

use rand::RngCore;

/// Pad `data` up to the next 16-byte boundary. Zero padding by default;
/// `pad_with_random` fills with random bytes instead (used where the tail
/// must not be predictable, e.g. wrapped private keys).
pub fn align16(data: &[u8], pad_with_random: bool) -> Vec<u8> {
    let mut out = data.to_vec();
    let rem = out.len() % 16;
    if rem != 0 {
        let pad = 16 - rem;
        if pad_with_random {
            let mut tail = vec![0u8; pad];
            rand::rngs::OsRng.fill_bytes(&mut tail);
            out.extend_from_slice(&tail);
        } else {
            out.resize(out.len() + pad, 0);
        }
    }
    out
}

pub fn random_bytes(n: usize) -> Vec<u8> {
    let mut out = vec![0u8; n];
    rand::rngs::OsRng.fill_bytes(&mut out);
    out
}

pub fn random_key() -> [u8; 16] {
    let mut out = [0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut out);
    out
}

/// Fold a 32-byte packed file key into the 16-byte AES key used for
/// attribute decryption: the two halves XORed together.
pub fn unpack_file_key(key: &[u8; 32]) -> [u8; 16] {
    let mut out = [0u8; 16];
    for i in 0..16 {
        out[i] = key[i] ^ key[i + 16];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_noop_when_aligned() {
        let data = [1u8; 32];
        assert_eq!(align16(&data, false), data);
        assert_eq!(align16(&data, true), data);
    }

    #[test]
    fn align_pads_with_zeros() {
        let out = align16(&[0xFFu8; 5], false);
        assert_eq!(out.len(), 16);
        assert_eq!(&out[5..], &[0u8; 11]);
    }

    #[test]
    fn align_random_preserves_prefix() {
        let out = align16(b"abc", true);
        assert_eq!(out.len(), 16);
        assert_eq!(&out[..3], b"abc");
    }

    #[test]
    fn file_key_fold() {
        let mut key = [0u8; 32];
        key[0] = 0xF0;
        key[16] = 0x0F;
        assert_eq!(unpack_file_key(&key)[0], 0xFF);
        assert_eq!(unpack_file_key(&key)[1..], [0u8; 15]);
    }

    #[test]
    fn random_keys_differ() {
        assert_ne!(random_key(), random_key());
    }
}
