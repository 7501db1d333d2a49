//! URL-safe base64 without padding — the service's universal byte encoding.
//!
//! Encoding always emits the `-_` alphabet with no `=` padding. Decoding is
//! tolerant: older server responses and stored blobs occasionally carry the
//! standard `+/` alphabet or trailing padding, so both are normalised first.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

use crate::error::CryptoError;

pub fn ub64enc(data: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(data)
}

pub fn ub64dec(s: &str) -> Result<Vec<u8>, CryptoError> {
    let normalised: String = s
        .chars()
        .filter(|c| *c != '=' && !c.is_whitespace())
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            c => c,
        })
        .collect();
    Ok(URL_SAFE_NO_PAD.decode(normalised.as_bytes())?)
}
