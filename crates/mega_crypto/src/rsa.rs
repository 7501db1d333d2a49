//! RSA in the service's wire form.
//!
//! Integers travel as MPIs: a 2-byte big-endian bit count followed by the
//! big-endian magnitude. The public key is MPI(n) ‖ MPI(e); the private key
//! plaintext is MPI(p) ‖ MPI(q) ‖ MPI(d) ‖ MPI(u) with u = p⁻¹ mod q, and is
//! stored AES-ECB-wrapped under the master key. Encryption is raw modular
//! exponentiation over that framing; the service applies no OAEP/PKCS#1
//! padding, so none is used here.

use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::BigUint;

use crate::aes::{aes_dec, aes_enc};
use crate::buf::align16;
use crate::error::CryptoError;

/// Decrypted session ids are exactly this long.
pub const SID_LEN: usize = 43;

fn read_mpi(buf: &[u8], pos: usize) -> Result<(BigUint, usize), CryptoError> {
    if buf.len() < pos + 2 {
        return Err(CryptoError::BadMpi);
    }
    let bits = u16::from_be_bytes([buf[pos], buf[pos + 1]]) as usize;
    let nbytes = (bits + 7) / 8;
    let start = pos + 2;
    if buf.len() < start + nbytes {
        return Err(CryptoError::BadMpi);
    }
    Ok((BigUint::from_bytes_be(&buf[start..start + nbytes]), start + nbytes))
}

fn write_mpi(out: &mut Vec<u8>, n: &BigUint) {
    let bits = n.bits() as u16;
    out.extend_from_slice(&bits.to_be_bytes());
    out.extend_from_slice(&n.to_bytes_be());
}

// ── Public key ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct RsaPublic {
    n: BigUint,
    e: BigUint,
}

impl RsaPublic {
    pub fn parse(wire: &[u8]) -> Result<Self, CryptoError> {
        let (n, pos) = read_mpi(wire, 0)?;
        let (e, _) = read_mpi(wire, pos)?;
        Ok(Self { n, e })
    }

    pub fn to_wire(&self) -> Vec<u8> {
        let mut out = Vec::new();
        write_mpi(&mut out, &self.n);
        write_mpi(&mut out, &self.e);
        out
    }

    /// Raw RSA: payload interpreted as a big-endian integer, result MPI-framed.
    pub fn encrypt(&self, payload: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let m = BigUint::from_bytes_be(payload);
        if m >= self.n {
            return Err(CryptoError::InvalidKey(
                "RSA payload does not fit the modulus".into(),
            ));
        }
        let c = m.modpow(&self.e, &self.n);
        let mut out = Vec::new();
        write_mpi(&mut out, &c);
        Ok(out)
    }
}

// ── Private key ───────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct RsaPrivate {
    p: BigUint,
    q: BigUint,
    d: BigUint,
    u: BigUint,
    n: BigUint,
}

impl RsaPrivate {
    /// Parse the plaintext MPI sequence p ‖ q ‖ d ‖ u. Trailing bytes
    /// (alignment padding from the wrap) are ignored.
    pub fn parse(plain: &[u8]) -> Result<Self, CryptoError> {
        let (p, pos) = read_mpi(plain, 0)?;
        let (q, pos) = read_mpi(plain, pos)?;
        let (d, pos) = read_mpi(plain, pos)?;
        let (u, _) = read_mpi(plain, pos)?;
        let n = &p * &q;
        Ok(Self { p, q, d, u, n })
    }

    /// ECB-unwrap with the master key, then parse.
    pub fn unwrap(mk: &[u8; 16], wrapped: &[u8]) -> Result<Self, CryptoError> {
        let plain = aes_dec(mk, wrapped)?;
        Self::parse(&plain)
    }

    pub fn to_wire(&self) -> Vec<u8> {
        let mut out = Vec::new();
        write_mpi(&mut out, &self.p);
        write_mpi(&mut out, &self.q);
        write_mpi(&mut out, &self.d);
        write_mpi(&mut out, &self.u);
        out
    }

    /// Wrap the plaintext wire form under the master key. The tail is padded
    /// with random bytes so the final block never ends in a known pattern.
    pub fn wrap(&self, mk: &[u8; 16]) -> Result<Vec<u8>, CryptoError> {
        aes_enc(mk, &align16(&self.to_wire(), true))
    }

    /// Raw RSA decryption of an MPI-framed ciphertext. The result is
    /// zero-extended to the modulus width: payloads live in the
    /// most-significant bytes, so stripping leading zeros would shift every
    /// byte whenever the plaintext happens to start with 0x00.
    pub fn decrypt(&self, mpi_ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let (c, _) = read_mpi(mpi_ciphertext, 0)?;
        if c >= self.n {
            return Err(CryptoError::RsaDecrypt(
                "ciphertext exceeds the modulus".into(),
            ));
        }
        let m = c.modpow(&self.d, &self.n);
        let magnitude = m.to_bytes_be();
        let width = (self.n.bits() + 7) / 8;
        let mut out = vec![0u8; width];
        out[width - magnitude.len()..].copy_from_slice(&magnitude);
        Ok(out)
    }

    /// Decrypt a challenge session id: the first 43 bytes of the
    /// modulus-width plaintext.
    pub fn decrypt_sid(&self, csid: &[u8]) -> Result<[u8; SID_LEN], CryptoError> {
        let m = self.decrypt(csid)?;
        if m.len() < SID_LEN {
            return Err(CryptoError::RsaDecrypt(format!(
                "decrypted sid too short: {} bytes",
                m.len()
            )));
        }
        let mut out = [0u8; SID_LEN];
        out.copy_from_slice(&m[..SID_LEN]);
        Ok(out)
    }

    pub fn public(&self) -> RsaPublic {
        RsaPublic {
            n: self.n.clone(),
            e: BigUint::from(65537u32),
        }
    }
}

// ── Generation ────────────────────────────────────────────────────────────────

/// A freshly generated keypair: public wire form plus the MK-wrapped private
/// key, ready for an account-update request.
pub struct RsaKeyPair {
    pub pubk: Vec<u8>,
    pub privk: Vec<u8>,
}

/// Generate a keypair of the given modulus size and wrap the private half
/// under the master key.
pub fn generate_keypair(mk: &[u8; 16], bits: usize) -> Result<RsaKeyPair, CryptoError> {
    let key = rsa::RsaPrivateKey::new(&mut rand::rngs::OsRng, bits)
        .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
    let primes = key.primes();
    let p = primes[0].clone();
    let q = primes[1].clone();
    // q is prime, so Fermat gives the inverse directly.
    let u = p.modpow(&(&q - 2u32), &q);
    let private = RsaPrivate {
        n: &p * &q,
        d: key.d().clone(),
        p,
        q,
        u,
    };
    let public = RsaPublic {
        n: key.n().clone(),
        e: key.e().clone(),
    };
    Ok(RsaKeyPair {
        pubk: public.to_wire(),
        privk: private.wrap(mk)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // 512-bit keys keep the tests fast; wire-form handling is size-agnostic.
    const TEST_BITS: usize = 512;

    fn test_private(mk: &[u8; 16]) -> (RsaKeyPair, RsaPrivate) {
        let pair = generate_keypair(mk, TEST_BITS).unwrap();
        let private = RsaPrivate::unwrap(mk, &pair.privk).unwrap();
        (pair, private)
    }

    #[test]
    fn keypair_wire_roundtrip() {
        let mk = [3u8; 16];
        let (pair, private) = test_private(&mk);
        let public = RsaPublic::parse(&pair.pubk).unwrap();
        assert_eq!(public.to_wire(), pair.pubk);
        // Unwrap-then-rewrap must preserve the MPI body (padding differs).
        let rewrapped = private.wrap(&mk).unwrap();
        let replain = RsaPrivate::unwrap(&mk, &rewrapped).unwrap();
        assert_eq!(replain.to_wire(), private.to_wire());
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let mk = [5u8; 16];
        let (pair, private) = test_private(&mk);
        let public = RsaPublic::parse(&pair.pubk).unwrap();
        let payload = b"\x01forty-three byte session identifier..x";
        let ct = public.encrypt(payload).unwrap();
        // Decryption is zero-extended to the modulus width; the payload
        // occupies the least-significant bytes of the integer it encoded.
        let pt = private.decrypt(&ct).unwrap();
        assert_eq!(pt.len(), TEST_BITS / 8);
        let split = pt.len() - payload.len();
        assert!(pt[..split].iter().all(|&b| b == 0));
        assert_eq!(&pt[split..], payload);
    }

    #[test]
    fn sid_roundtrip() {
        let mk = [7u8; 16];
        let (pair, private) = test_private(&mk);
        let public = RsaPublic::parse(&pair.pubk).unwrap();
        // The sid rides in the most-significant bytes of a modulus-width
        // message, the way the server builds a csid.
        let mut msg = vec![0x17u8; TEST_BITS / 8];
        for (i, b) in msg[..SID_LEN].iter_mut().enumerate() {
            *b = 0x41 + (i as u8 % 26);
        }
        let sid: [u8; SID_LEN] = msg[..SID_LEN].try_into().unwrap();
        let ct = public.encrypt(&msg).unwrap();
        assert_eq!(private.decrypt_sid(&ct).unwrap(), sid);
    }

    #[test]
    fn sid_with_leading_zero_byte_keeps_alignment() {
        let mk = [8u8; 16];
        let (pair, private) = test_private(&mk);
        let public = RsaPublic::parse(&pair.pubk).unwrap();
        // A sid whose first byte is 0x00 shortens the decrypted magnitude;
        // zero-extension must restore its wire position.
        let mut msg = vec![0x29u8; TEST_BITS / 8];
        msg[0] = 0x00;
        let sid: [u8; SID_LEN] = msg[..SID_LEN].try_into().unwrap();
        let ct = public.encrypt(&msg).unwrap();
        assert_eq!(private.decrypt_sid(&ct).unwrap(), sid);
    }

    #[test]
    fn truncated_mpi_rejected() {
        assert!(matches!(RsaPublic::parse(&[0x04]), Err(CryptoError::BadMpi)));
        // Bit count promises more bytes than present.
        assert!(matches!(
            RsaPublic::parse(&[0x00, 0x20, 0x01]),
            Err(CryptoError::BadMpi)
        ));
    }

    #[test]
    fn unwrap_with_wrong_key_fails() {
        let mk = [9u8; 16];
        let (pair, _) = test_private(&mk);
        let wrong = [10u8; 16];
        // Garbage plaintext parses as absurd MPIs or errors outright; either
        // way it must not produce the original key.
        match RsaPrivate::unwrap(&wrong, &pair.privk) {
            Err(_) => {}
            Ok(k) => {
                let real = RsaPrivate::unwrap(&mk, &pair.privk).unwrap();
                assert_ne!(k.to_wire(), real.to_wire());
            }
        }
    }
}
