use thiserror::Error;

use crate::transport::TransportError;
use mega_proto::ServiceError;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    #[error("Empty response from server")]
    Empty,

    #[error("Unexpected response shape: {0}")]
    UnexpectedResponse(String),

    #[error("Invalid temporary session id")]
    InvalidTsid,

    #[error("Session id decryption failed")]
    SidDecrypt,

    #[error("Bad password")]
    BadPassword,

    #[error("Session state error: {0}")]
    State(&'static str),

    #[error("Crypto error: {0}")]
    Crypto(#[from] mega_crypto::CryptoError),

    #[error("Protocol error: {0}")]
    Proto(#[from] mega_proto::ProtoError),

    #[error("Serialisation error: {0}")]
    Serialisation(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
