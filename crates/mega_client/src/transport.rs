//! HTTP transport seam.
//!
//! The engine only needs "POST a body, get a body back". Failures carry a
//! kind so the retry policy can tell a transient condition (server busy,
//! nothing answered) from a hard one. The production implementation rides
//! reqwest with rustls; tests substitute a scripted stub.

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::ClientConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The server answered but refused the request under load.
    Busy,
    /// Nothing usable came back: timeout, connect failure, dropped socket.
    NoResponse,
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransportErrorKind::Busy => "busy",
            TransportErrorKind::NoResponse => "no_response",
            TransportErrorKind::Other => "other",
        })
    }
}

#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Busy and no-response failures drive the backoff loop; everything
    /// else surfaces verbatim.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            TransportErrorKind::Busy | TransportErrorKind::NoResponse
        )
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, url: &str, body: String) -> Result<String, TransportError>;
}

// ── Production transport ──────────────────────────────────────────────────────

pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| TransportError::new(TransportErrorKind::Other, e.to_string()))?;
        Ok(Self { client })
    }
}

fn classify(e: reqwest::Error) -> TransportError {
    let kind = if e.is_timeout() || e.is_connect() {
        TransportErrorKind::NoResponse
    } else {
        TransportErrorKind::Other
    };
    TransportError::new(kind, e.to_string())
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, url: &str, body: String) -> Result<String, TransportError> {
        let res = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(classify)?;

        let status = res.status();
        if status.is_server_error() {
            return Err(TransportError::new(
                TransportErrorKind::Busy,
                format!("server returned {status}"),
            ));
        }
        if !status.is_success() {
            return Err(TransportError::new(
                TransportErrorKind::Other,
                format!("server returned {status}"),
            ));
        }
        res.text().await.map_err(classify)
    }
}

// ── Test transport ────────────────────────────────────────────────────────────
