//! API transaction engine.
//!
//! Requests travel as a JSON array POSTed to `/cs?id=<callId>` with the
//! session id appended under `sid` (or `n` for exported-folder sessions).
//! The call id is a per-instance counter bumped once per logical batch; a
//! batch keeps its id across transport retries.
//!
//! The response is either a scalar negative integer — a global failure that
//! applies to every request in the batch — or an array matching the batch
//! positionally, each slot a success object or a negative integer.

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::transport::Transport;
use mega_proto::ServiceError;

/// Which query parameter carries the session id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SidParam {
    /// Authenticated session: `sid`.
    Sid,
    /// Exported-folder session: `n`.
    Node,
}

impl SidParam {
    pub fn as_str(&self) -> &'static str {
        match self {
            SidParam::Sid => "sid",
            SidParam::Node => "n",
        }
    }
}

pub struct Api {
    transport: Arc<dyn Transport>,
    config: ClientConfig,
    call_id: u64,
    sid: Option<String>,
    sid_param: SidParam,
}

impl Api {
    pub fn new(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            config,
            call_id: 0,
            sid: None,
            sid_param: SidParam::Sid,
        }
    }

    pub fn set_session(&mut self, sid: Option<String>, param: SidParam) {
        self.sid = sid;
        self.sid_param = param;
    }

    pub fn call_id(&self) -> u64 {
        self.call_id
    }

    /// Send one batch. The outer error covers whole-batch failures that are
    /// not expressible per position (transport, malformed response); the
    /// inner results line up with `requests`.
    pub async fn batch(
        &mut self,
        requests: &[Value],
    ) -> Result<Vec<Result<Value, ServiceError>>, ClientError> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        self.call_id += 1;
        let mut url = format!("{}/cs?id={}", self.config.api_origin, self.call_id);
        if let Some(sid) = &self.sid {
            url.push_str(&format!("&{}={}", self.sid_param.as_str(), sid));
        }
        let body = serde_json::to_string(requests)?;

        let mut delay = self.config.retry_initial;
        let mut retries = 0u32;
        let text = loop {
            debug!(call_id = self.call_id, n = requests.len(), "dispatching batch");
            match self.transport.post(&url, body.clone()).await {
                Ok(text) => break text,
                Err(e) if e.is_retryable() => {
                    retries += 1;
                    if let Some(max) = self.config.max_retries {
                        if retries > max {
                            return Err(e.into());
                        }
                    }
                    warn!(
                        kind = %e.kind,
                        delay_ms = delay.as_millis() as u64,
                        "transport failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(self.config.retry_ceiling);
                }
                Err(e) => return Err(e.into()),
            }
        };

        if text.trim().is_empty() {
            return Err(ClientError::Empty);
        }
        let value: Value = serde_json::from_str(&text)?;
        self.demux(requests.len(), value)
    }

    /// Convenience batch-of-one; a negative result becomes a rejection.
    pub async fn call(&mut self, request: Value) -> Result<Value, ClientError> {
        let mut results = self.batch(std::slice::from_ref(&request)).await?;
        match results.pop() {
            Some(Ok(value)) => Ok(value),
            Some(Err(e)) => Err(e.into()),
            None => Err(ClientError::Empty),
        }
    }

    fn demux(
        &self,
        expected: usize,
        value: Value,
    ) -> Result<Vec<Result<Value, ServiceError>>, ClientError> {
        match value {
            // Scalar: a global error for the whole batch.
            Value::Number(_) => {
                let code = value
                    .as_i64()
                    .ok_or_else(|| ClientError::UnexpectedResponse(value.to_string()))?;
                if code > 0 {
                    return Err(ClientError::UnexpectedResponse(value.to_string()));
                }
                let err = ServiceError::from_code(code);
                warn!(code, "global batch failure: {err}");
                Ok((0..expected).map(|_| Err(err)).collect())
            }
            Value::Array(items) => {
                if items.len() != expected {
                    return Err(ClientError::UnexpectedResponse(format!(
                        "{} results for {} requests",
                        items.len(),
                        expected
                    )));
                }
                Ok(items
                    .into_iter()
                    .map(|item| match item.as_i64() {
                        Some(code) if code < 0 => Err(ServiceError::from_code(code)),
                        _ => Ok(item),
                    })
                    .collect())
            }
            other => Err(ClientError::UnexpectedResponse(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::ScriptedTransport;
    use crate::transport::TransportErrorKind;
    use serde_json::json;
    use std::time::Duration;

    fn fast_config() -> ClientConfig {
        ClientConfig {
            api_origin: "https://api.test".to_string(),
            retry_initial: Duration::from_millis(1),
            retry_ceiling: Duration::from_millis(4),
            ..ClientConfig::default()
        }
    }

    fn api_with(stub: Arc<ScriptedTransport>) -> Api {
        Api::new(fast_config(), stub)
    }

    #[tokio::test]
    async fn call_ids_increase_per_batch() {
        let stub = Arc::new(ScriptedTransport::new());
        stub.push_ok(r#"[0]"#);
        stub.push_ok(r#"[0]"#);
        let mut api = api_with(stub.clone());

        api.call(json!({"a": "ug"})).await.unwrap();
        api.call(json!({"a": "ug"})).await.unwrap();

        let calls = stub.calls();
        assert!(calls[0].0.contains("/cs?id=1"));
        assert!(calls[1].0.contains("/cs?id=2"));
        assert_eq!(api.call_id(), 2);
    }

    #[tokio::test]
    async fn mixed_batch_outcomes() {
        let stub = Arc::new(ScriptedTransport::new());
        stub.push_ok(r#"[{"ok":1},-9,{"ok":3}]"#);
        let mut api = api_with(stub.clone());

        let reqs = vec![json!({"a":"x"}), json!({"a":"y"}), json!({"a":"z"})];
        let results = api.batch(&reqs).await.unwrap();

        assert_eq!(results[0], Ok(json!({"ok":1})));
        assert_eq!(results[1], Err(ServiceError::NoEnt));
        assert_eq!(results[2], Ok(json!({"ok":3})));
        assert_eq!(results[1].as_ref().unwrap_err().to_string(), "ENOENT (-9): Not found");
        // One logical batch, one call id.
        assert_eq!(stub.calls().len(), 1);
        assert_eq!(api.call_id(), 1);
    }

    #[tokio::test]
    async fn global_integer_rejects_every_position() {
        let stub = Arc::new(ScriptedTransport::new());
        stub.push_ok("-3");
        let mut api = api_with(stub);

        let reqs = vec![json!({"a":"x"}), json!({"a":"y"})];
        let results = api.batch(&reqs).await.unwrap();
        assert_eq!(results, vec![Err(ServiceError::Again), Err(ServiceError::Again)]);
    }

    #[tokio::test]
    async fn retries_keep_the_call_id() {
        let stub = Arc::new(ScriptedTransport::new());
        stub.push_err(TransportErrorKind::Busy);
        stub.push_err(TransportErrorKind::NoResponse);
        stub.push_ok(r#"[0]"#);
        let mut api = api_with(stub.clone());

        api.call(json!({"a": "ug"})).await.unwrap();

        let calls = stub.calls();
        assert_eq!(calls.len(), 3);
        for (url, _) in &calls {
            assert!(url.contains("/cs?id=1"), "retry changed the call id: {url}");
        }
    }

    #[tokio::test]
    async fn non_retryable_transport_error_surfaces() {
        let stub = Arc::new(ScriptedTransport::new());
        stub.push_err(TransportErrorKind::Other);
        let mut api = api_with(stub.clone());

        let err = api.call(json!({"a": "ug"})).await.unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
        assert_eq!(stub.calls().len(), 1);
    }

    #[tokio::test]
    async fn retry_limit_is_honoured() {
        let stub = Arc::new(ScriptedTransport::new());
        for _ in 0..4 {
            stub.push_err(TransportErrorKind::Busy);
        }
        let mut api = Api::new(
            ClientConfig {
                max_retries: Some(2),
                ..fast_config()
            },
            stub.clone(),
        );

        let err = api.call(json!({"a": "ug"})).await.unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
        assert_eq!(stub.calls().len(), 3); // initial + 2 retries
    }

    #[tokio::test]
    async fn application_errors_are_not_retried() {
        let stub = Arc::new(ScriptedTransport::new());
        stub.push_ok("[-18]");
        let mut api = api_with(stub.clone());

        let err = api.call(json!({"a": "ug"})).await.unwrap_err();
        assert!(matches!(err, ClientError::Service(ServiceError::TempUnavail)));
        assert_eq!(stub.calls().len(), 1);
    }

    #[tokio::test]
    async fn empty_body_is_an_error() {
        let stub = Arc::new(ScriptedTransport::new());
        stub.push_ok("");
        let mut api = api_with(stub);
        assert!(matches!(
            api.call(json!({"a": "ug"})).await.unwrap_err(),
            ClientError::Empty
        ));
    }

    #[tokio::test]
    async fn sid_parameter_forms() {
        let stub = Arc::new(ScriptedTransport::new());
        stub.push_ok(r#"[0]"#);
        stub.push_ok(r#"[0]"#);
        let mut api = api_with(stub.clone());

        api.set_session(Some("SESSIONID".into()), SidParam::Sid);
        api.call(json!({"a": "ug"})).await.unwrap();
        api.set_session(Some("FOLDERHANDLE".into()), SidParam::Node);
        api.call(json!({"a": "f"})).await.unwrap();

        let calls = stub.calls();
        assert!(calls[0].0.ends_with("&sid=SESSIONID"));
        assert!(calls[1].0.ends_with("&n=FOLDERHANDLE"));
    }

    #[tokio::test]
    async fn requests_preserve_wire_order() {
        let stub = Arc::new(ScriptedTransport::new());
        stub.push_ok(r#"[1,2]"#);
        let mut api = api_with(stub.clone());

        let reqs = vec![json!({"a":"first"}), json!({"a":"second"})];
        api.batch(&reqs).await.unwrap();

        let body = &stub.calls()[0].1;
        let first = body.find("first").unwrap();
        let second = body.find("second").unwrap();
        assert!(first < second);
    }
}
