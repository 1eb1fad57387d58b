//! JSON-RPC over HTTP client for backend MCP servers
//!
//! All backend network I/O goes through here. Results are returned as
//! untyped JSON; the registry decides what a `tools/list` or `tools/call`
//! result means.
use crate::config::BackendConfig;
use crate::core::protocol::{JsonRpcRequest, JsonRpcResponse, RequestId};
use crate::core::RequestIdGenerator;
use crate::utils::errors::{RouterError, RouterResult};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Method used for liveness probes
pub const HEALTH_PROBE_METHOD: &str = "ping";

/// Outgoing side of the router: one call to one backend
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BackendClient: Send + Sync {
    /// Issue one JSON-RPC call and return its `result` member.
    async fn call(
        &self,
        backend: &BackendConfig,
        method: &str,
        params: Option<Value>,
    ) -> RouterResult<Value>;

    /// Cheap liveness probe. Any well-formed JSON-RPC reply counts as alive.
    async fn probe(&self, backend: &BackendConfig) -> RouterResult<()>;

    /// Probe that never fails: every error maps to `false`.
    async fn health_check(&self, backend: &BackendConfig) -> bool {
        self.probe(backend).await.is_ok()
    }
}

/// reqwest-backed [`BackendClient`]
pub struct HttpBackendClient {
    client: Client,
    ids: RequestIdGenerator,
}

impl HttpBackendClient {
    pub fn new() -> RouterResult<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| RouterError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            ids: RequestIdGenerator::new(),
        })
    }

    async fn send(
        &self,
        backend: &BackendConfig,
        url: &str,
        method: &str,
        params: Option<Value>,
    ) -> RouterResult<JsonRpcResponse> {
        let id = self.ids.next_id();
        let request = JsonRpcRequest::with_id(method, params, id.clone());
        let timeout = backend.timeout();
        let fail = |message: String| RouterError::backend_call(&backend.name, method, message);
        let url = Url::parse(url).map_err(|e| fail(format!("invalid URL: {}", e)))?;

        debug!(backend = %backend.name, method, id = ?id, "Sending backend request");

        let response = self
            .client
            .post(url)
            .timeout(timeout)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json, text/event-stream")
            .json(&request)
            .send()
            .await
            .map_err(|e| fail(describe_error(e, timeout)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fail(format!("HTTP {}", status)));
        }

        let is_event_stream = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/event-stream"));

        let body = response
            .text()
            .await
            .map_err(|e| fail(describe_error(e, timeout)))?;

        let parsed = if is_event_stream {
            parse_event_stream(&body, &id)
        } else {
            serde_json::from_str::<JsonRpcResponse>(&body)
                .map_err(|e| format!("malformed JSON-RPC response: {}", e))
        };
        let parsed = parsed.map_err(fail)?;

        if parsed.id.as_ref() != Some(&id) {
            warn!(
                backend = %backend.name,
                method,
                expected = ?id,
                received = ?parsed.id,
                "Backend response id does not match request"
            );
        }

        Ok(parsed)
    }
}

#[async_trait]
impl BackendClient for HttpBackendClient {
    async fn call(
        &self,
        backend: &BackendConfig,
        method: &str,
        params: Option<Value>,
    ) -> RouterResult<Value> {
        let response = self.send(backend, &backend.base_url, method, params).await?;

        if let Some(error) = response.error {
            return Err(RouterError::backend_call(
                &backend.name,
                method,
                format!("JSON-RPC error {}: {}", error.code, error.message),
            ));
        }

        Ok(response.result.unwrap_or(Value::Null))
    }

    async fn probe(&self, backend: &BackendConfig) -> RouterResult<()> {
        self.send(backend, backend.health_url(), HEALTH_PROBE_METHOD, None)
            .await
            .map(|_| ())
    }
}

/// Human-readable cause, without the request URL.
fn describe_error(error: reqwest::Error, timeout: Duration) -> String {
    if error.is_timeout() {
        return format!("request timed out after {}ms", timeout.as_millis());
    }
    if error.is_connect() {
        return "connection failed".to_string();
    }
    error.without_url().to_string()
}

/// Pick the JSON-RPC response for `id` out of an SSE body.
fn parse_event_stream(body: &str, id: &RequestId) -> Result<JsonRpcResponse, String> {
    let mut fallback = None;

    for event in body.split("\n\n") {
        let data: Vec<&str> = event
            .lines()
            .filter_map(|line| line.strip_prefix("data:"))
            .map(|d| d.strip_prefix(' ').unwrap_or(d))
            .collect();
        if data.is_empty() {
            continue;
        }

        let Ok(message) = serde_json::from_str::<JsonRpcResponse>(&data.join("\n")) else {
            continue;
        };
        if message.id.as_ref() == Some(id) {
            return Ok(message);
        }
        if fallback.is_none() && (message.result.is_some() || message.error.is_some()) {
            fallback = Some(message);
        }
    }

    fallback.ok_or_else(|| "event stream carried no JSON-RPC response".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_event_stream_matches_id() {
        let body = "event: message\ndata: {\"jsonrpc\":\"2.0\",\"method\":\"notifications/progress\"}\n\n\
                    event: message\ndata: {\"jsonrpc\":\"2.0\",\"id\":7,\"result\":{\"ok\":true}}\n\n";
        let response = parse_event_stream(body, &RequestId::Number(7)).unwrap();
        assert_eq!(response.result, Some(json!({"ok": true})));
    }

    #[test]
    fn test_parse_event_stream_without_response() {
        let body = "event: ping\n\n";
        assert!(parse_event_stream(body, &RequestId::Number(1)).is_err());
    }

    #[test]
    fn test_parse_event_stream_multiline_data() {
        let body = "data: {\"jsonrpc\":\"2.0\",\ndata: \"id\":3,\"result\":[]}\n\n";
        let response = parse_event_stream(body, &RequestId::Number(3)).unwrap();
        assert_eq!(response.result, Some(json!([])));
    }
}
