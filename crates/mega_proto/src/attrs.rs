//! Encrypted node attributes.
//!
//! Wire format: `ub64(AES-CBC-zeroIV(node_key, align16("MEGA" ‖ json)))`.
//! The decoded plaintext must begin with the byte prefix `MEGA{`; the JSON
//! tail may carry trailing zero padding from the block alignment.
//!
//! Decoding is deliberately forgiving: any failure — bad base64, unaligned
//! ciphertext, missing magic, malformed JSON — yields `None` so a single
//! corrupt node cannot abort a filesystem load.

use serde_json::{Map, Value};

use mega_crypto::aes::{aes_dec_cbc, aes_enc_cbc};
use mega_crypto::b64::{ub64dec, ub64enc};
use mega_crypto::buf::align16;

use crate::error::ProtoError;

const MAGIC: &[u8] = b"MEGA";
const MAGIC_PREFIX: &[u8] = b"MEGA{";

/// Encrypt an attribute mapping under a node key.
pub fn make_node_attrs(key: &[u8; 16], attrs: &Map<String, Value>) -> Result<String, ProtoError> {
    let json = serde_json::to_vec(&Value::Object(attrs.clone()))?;
    let mut plain = Vec::with_capacity(MAGIC.len() + json.len());
    plain.extend_from_slice(MAGIC);
    plain.extend_from_slice(&json);
    let ct = aes_enc_cbc(key, &align16(&plain, false))?;
    Ok(ub64enc(&ct))
}

/// Decrypt an attribute blob. `None` on any mismatch, never a panic.
pub fn dec_node_attrs(key: &[u8; 16], blob: &str) -> Option<Map<String, Value>> {
    let ct = ub64dec(blob).ok()?;
    let plain = aes_dec_cbc(key, &ct).ok()?;
    if !plain.starts_with(MAGIC_PREFIX) {
        return None;
    }
    let tail = &plain[MAGIC.len()..];
    let end = tail
        .iter()
        .rposition(|&b| b != 0)
        .map(|i| i + 1)
        .unwrap_or(0);
    match serde_json::from_slice::<Value>(&tail[..end]) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(name: &str) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("n".to_string(), Value::String(name.to_string()));
        map
    }

    const KEY: [u8; 16] = [0x5A; 16];

    #[test]
    fn roundtrip() {
        let a = attrs("hello.txt");
        let blob = make_node_attrs(&KEY, &a).unwrap();
        assert_eq!(dec_node_attrs(&KEY, &blob), Some(a));
    }

    #[test]
    fn roundtrip_with_extra_fields() {
        let mut a = attrs("report.pdf");
        a.insert("label".into(), Value::from(3));
        let blob = make_node_attrs(&KEY, &a).unwrap();
        assert_eq!(dec_node_attrs(&KEY, &blob), Some(a));
    }

    #[test]
    fn wrong_key_is_none() {
        let blob = make_node_attrs(&KEY, &attrs("x")).unwrap();
        let wrong = [0xA5u8; 16];
        assert_eq!(dec_node_attrs(&wrong, &blob), None);
    }

    #[test]
    fn corrupt_ciphertext_is_none() {
        let blob = make_node_attrs(&KEY, &attrs("x")).unwrap();
        let mut ct = ub64dec(&blob).unwrap();
        ct[0] ^= 0x01;
        assert_eq!(dec_node_attrs(&KEY, &ub64enc(&ct)), None);
    }

    #[test]
    fn missing_magic_is_none() {
        // Valid CBC of a payload that lacks the MEGA{ prefix.
        let plain = align16(b"NOPE{\"n\":\"x\"}", false);
        let ct = aes_enc_cbc(&KEY, &plain).unwrap();
        assert_eq!(dec_node_attrs(&KEY, &ub64enc(&ct)), None);
    }

    #[test]
    fn bad_base64_is_none() {
        assert_eq!(dec_node_attrs(&KEY, "!!not-base64!!"), None);
    }

    #[test]
    fn unaligned_ciphertext_is_none() {
        assert_eq!(dec_node_attrs(&KEY, &ub64enc(&[0u8; 17])), None);
    }
}
