use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Invalid key material: {0}")]
    InvalidKey(String),

    #[error("Buffer not block-aligned: length {0}")]
    Misaligned(usize),

    #[error("Malformed multi-precision integer")]
    BadMpi,

    #[error("RSA key generation failed: {0}")]
    KeyGeneration(String),

    #[error("RSA decryption failed: {0}")]
    RsaDecrypt(String),

    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),
}
