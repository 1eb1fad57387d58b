//! Mock JSON-RPC backends for integration tests
#![allow(dead_code)]

use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Replies with `result`, echoing the request id
pub struct RpcResult {
    result: Value,
    delay: Option<Duration>,
}

impl RpcResult {
    pub fn new(result: Value) -> Self {
        Self { result, delay: None }
    }

    pub fn delayed(result: Value, delay: Duration) -> Self {
        Self {
            result,
            delay: Some(delay),
        }
    }
}

impl Respond for RpcResult {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let id = serde_json::from_slice::<Value>(&request.body)
            .ok()
            .and_then(|body| body.get("id").cloned())
            .unwrap_or(Value::Null);

        let template = ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": self.result,
        }));
        match self.delay {
            Some(delay) => template.set_delay(delay),
            None => template,
        }
    }
}

/// Echoes `tools/call` params back as the result
pub struct EchoCall;

impl Respond for EchoCall {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).unwrap_or(Value::Null);
        ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": body["id"],
            "result": {
                "content": [{"type": "text", "text": "ok"}],
                "received": body["params"],
            },
        }))
    }
}

pub fn tools_list(names: &[&str]) -> Value {
    json!({
        "tools": names
            .iter()
            .map(|n| json!({
                "name": n,
                "description": format!("{} description", n),
                "inputSchema": {"type": "object", "properties": {}},
            }))
            .collect::<Vec<_>>()
    })
}

/// Backend serving `tools/list`, `tools/call` (echo) and `ping`
pub async fn backend(tools: &[&str]) -> MockServer {
    let server = MockServer::start().await;
    mount_tools(&server, tools).await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "tools/call"})))
        .respond_with(EchoCall)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "ping"})))
        .respond_with(RpcResult::new(json!({})))
        .mount(&server)
        .await;
    server
}

pub async fn mount_tools(server: &MockServer, tools: &[&str]) {
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "tools/list"})))
        .respond_with(RpcResult::new(tools_list(tools)))
        .mount(server)
        .await;
}

pub fn client() -> Arc<dyn mcp_router::registry::BackendClient> {
    Arc::new(mcp_router::registry::HttpBackendClient::new().unwrap())
}
