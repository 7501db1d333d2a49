//! Client configuration.

use std::time::Duration;

/// Tunables for one client instance. `Default` matches production.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API origin, without a trailing slash.
    pub api_origin: String,
    pub user_agent: String,
    /// Per-request timeout on the underlying HTTP client.
    pub request_timeout: Duration,
    /// First backoff delay after a busy/no-response transport failure.
    pub retry_initial: Duration,
    /// Backoff doubles up to this ceiling.
    pub retry_ceiling: Duration,
    /// Give up after this many retries of one batch; `None` retries forever.
    pub max_retries: Option<u32>,
    /// Modulus size for generated RSA keypairs.
    pub rsa_key_bits: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_origin: "https://g.api.mega.co.nz".to_string(),
            user_agent: format!("mega-client/{}", env!("CARGO_PKG_VERSION")),
            request_timeout: Duration::from_secs(60),
            retry_initial: Duration::from_secs(10),
            retry_ceiling: Duration::from_secs(120),
            max_retries: None,
            rsa_key_bits: 2048,
        }
    }
}
