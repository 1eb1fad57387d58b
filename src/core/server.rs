//! MCP front end shared by every transport
use crate::config::ToolMode;
use crate::core::meta_tools::{call_meta_tool, is_meta_tool, meta_tool_descriptors};
use crate::core::protocol::{
    error_codes, CallToolParams, Implementation, InitializeResult, JsonRpcRequest, JsonRpcResponse,
    ListToolsResult, RequestId, ServerCapabilities, ToolCapabilities, ToolDescriptor, JSONRPC_VERSION,
    MCP_PROTOCOL_VERSION,
};
use crate::registry::{BackendHealth, BackendRegistry, RouterStats};
use crate::utils::errors::{RouterError, RouterResult};
use parking_lot::RwLock;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

pub const SERVER_NAME: &str = "mcp-router";

/// Router as seen by MCP clients
pub struct RouterServer {
    registry: Arc<BackendRegistry>,
    tool_mode: ToolMode,
    started_at: Instant,
    /// Latest result of the health loop
    health: RwLock<Option<Vec<BackendHealth>>>,
}

impl RouterServer {
    pub fn new(registry: Arc<BackendRegistry>, tool_mode: ToolMode) -> Self {
        Self {
            registry,
            tool_mode,
            started_at: Instant::now(),
            health: RwLock::new(None),
        }
    }

    pub fn registry(&self) -> &Arc<BackendRegistry> {
        &self.registry
    }

    pub fn tool_mode(&self) -> ToolMode {
        self.tool_mode
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn get_stats(&self) -> RouterStats {
        self.registry.get_stats(self.started_at)
    }

    pub fn latest_health(&self) -> Option<Vec<BackendHealth>> {
        self.health.read().clone()
    }

    /// Probe every backend and store the result as the latest snapshot.
    pub async fn check_health(&self) -> Vec<BackendHealth> {
        let report = self.registry.check_all_backends_health().await;
        *self.health.write() = Some(report.clone());
        report
    }

    /// Handle one raw JSON-RPC message.
    ///
    /// Returns `None` for notifications. Unparsable input yields a parse
    /// error with a null id.
    pub async fn handle_message(&self, raw: &str) -> Option<JsonRpcResponse> {
        let value: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Unparsable JSON-RPC message");
                return Some(JsonRpcResponse::error(
                    None,
                    error_codes::PARSE_ERROR,
                    format!("Parse error: {}", e),
                ));
            }
        };

        if value.is_array() {
            return Some(JsonRpcResponse::error(
                None,
                error_codes::INVALID_REQUEST,
                "Batch requests are not supported",
            ));
        }

        // Keep the id when the rest of the envelope is malformed
        let id = value
            .get("id")
            .and_then(|id| serde_json::from_value::<RequestId>(id.clone()).ok());

        let request: JsonRpcRequest = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(e) => {
                return Some(JsonRpcResponse::error(
                    id,
                    error_codes::INVALID_REQUEST,
                    format!("Invalid request: {}", e),
                ));
            }
        };

        self.handle_request(request).await
    }

    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.jsonrpc != JSONRPC_VERSION {
            return Some(JsonRpcResponse::error(
                request.id,
                error_codes::INVALID_REQUEST,
                format!("Unsupported jsonrpc version: {}", request.jsonrpc),
            ));
        }

        let Some(id) = request.id.clone() else {
            debug!(method = %request.method, "Received notification");
            return None;
        };

        debug!(method = %request.method, id = ?id, "Handling request");

        let result = match request.method.as_str() {
            "initialize" => self.initialize(),
            "ping" => Ok(json!({})),
            "tools/list" => self.list_tools(),
            "tools/call" => self.call_tool(request.params).await,
            method => {
                return Some(JsonRpcResponse::error(
                    Some(id),
                    error_codes::METHOD_NOT_FOUND,
                    format!("Method not found: {}", method),
                ));
            }
        };

        Some(match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(e) => error_response(id, &e),
        })
    }

    fn initialize(&self) -> RouterResult<Value> {
        let result = InitializeResult {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolCapabilities { list_changed: false }),
            },
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };
        info!(tool_mode = ?self.tool_mode, "Client initialized");
        Ok(serde_json::to_value(result)?)
    }

    fn list_tools(&self) -> RouterResult<Value> {
        let tools: Vec<ToolDescriptor> = match self.tool_mode {
            ToolMode::Direct => self
                .registry
                .get_all_tools()
                .iter()
                .map(|t| t.to_descriptor())
                .collect(),
            ToolMode::Meta => meta_tool_descriptors(),
        };
        debug!(count = tools.len(), "Listing tools");

        Ok(serde_json::to_value(ListToolsResult {
            tools,
            next_cursor: None,
        })?)
    }

    async fn call_tool(&self, params: Option<Value>) -> RouterResult<Value> {
        let params: CallToolParams = params
            .ok_or_else(|| RouterError::InvalidRequest("tools/call requires params".to_string()))
            .and_then(|p| {
                serde_json::from_value(p)
                    .map_err(|e| RouterError::InvalidRequest(format!("invalid tools/call params: {}", e)))
            })?;
        let arguments = params.arguments.unwrap_or_else(|| json!({}));

        if self.tool_mode == ToolMode::Meta && is_meta_tool(&params.name) {
            return call_meta_tool(&self.registry, &params.name, arguments).await;
        }

        self.registry.call_tool(&params.name, arguments).await
    }
}

/// JSON-RPC error carrying the machine-readable kind in `data.kind`.
pub fn error_response(id: RequestId, error: &RouterError) -> JsonRpcResponse {
    JsonRpcResponse::error_with_data(
        Some(id),
        error.rpc_code(),
        error.to_string(),
        json!({ "kind": error.error_code() }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;
    use crate::registry::client::MockBackendClient;

    async fn server(mode: ToolMode) -> RouterServer {
        let mut client = MockBackendClient::new();
        client
            .expect_call()
            .withf(|_, method, _| method == "tools/list")
            .returning(|_, _, _| {
                Ok(json!({"tools": [{"name": "list_campaigns", "description": "List", "inputSchema": {"type": "object"}}]}))
            });
        client
            .expect_call()
            .withf(|_, method, _| method == "tools/call")
            .returning(|_, _, params| Ok(json!({"echo": params})));

        let registry = Arc::new(BackendRegistry::new(Arc::new(client)));
        registry
            .register_backend(BackendConfig::new("ads", "http://localhost:9001", "ads_"))
            .unwrap();
        registry.refresh_all_tools().await;
        RouterServer::new(registry, mode)
    }

    #[tokio::test]
    async fn test_tools_list_wire_shape() {
        let server = server(ToolMode::Direct).await;
        let response = server
            .handle_message(r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#)
            .await
            .unwrap();

        let tools = &response.result.unwrap()["tools"];
        assert_eq!(tools[0]["name"], "ads_list_campaigns");
        assert_eq!(tools[0]["inputSchema"]["type"], "object");
        assert!(tools[0].get("backendName").is_none());
        assert!(tools[0].get("originalName").is_none());
    }

    #[tokio::test]
    async fn test_tools_call_forwards_original_name() {
        let server = server(ToolMode::Direct).await;
        let response = server
            .handle_message(
                r#"{"jsonrpc":"2.0","id":"a","method":"tools/call","params":{"name":"ads_list_campaigns","arguments":{"x":1}}}"#,
            )
            .await
            .unwrap();

        assert_eq!(response.id, Some(RequestId::String("a".to_string())));
        let result = response.result.unwrap();
        assert_eq!(result["echo"]["name"], "list_campaigns");
        assert_eq!(result["echo"]["arguments"]["x"], 1);
    }

    #[tokio::test]
    async fn test_unknown_tool_error_kind() {
        let server = server(ToolMode::Direct).await;
        let response = server
            .handle_message(r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"nope"}}"#)
            .await
            .unwrap();

        let error = response.error.unwrap();
        assert_eq!(error.code, -32602);
        assert_eq!(error.data.unwrap()["kind"], "UNKNOWN_TOOL");
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let server = server(ToolMode::Direct).await;

        let parse = server.handle_message("{not json").await.unwrap();
        assert_eq!(parse.id, None);
        assert_eq!(parse.error.unwrap().code, error_codes::PARSE_ERROR);

        let invalid = server.handle_message(r#"{"jsonrpc":"2.0","id":5}"#).await.unwrap();
        assert_eq!(invalid.id, Some(RequestId::Number(5)));
        assert_eq!(invalid.error.unwrap().code, error_codes::INVALID_REQUEST);

        let batch = server.handle_message(r#"[{"jsonrpc":"2.0","id":1,"method":"ping"}]"#).await.unwrap();
        assert_eq!(batch.error.unwrap().code, error_codes::INVALID_REQUEST);

        let missing = server
            .handle_message(r#"{"jsonrpc":"2.0","id":6,"method":"resources/list"}"#)
            .await
            .unwrap();
        assert_eq!(missing.error.unwrap().code, error_codes::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_notifications_produce_no_response() {
        let server = server(ToolMode::Direct).await;
        assert!(server
            .handle_message(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_initialize_camel_case() {
        let server = server(ToolMode::Direct).await;
        let response = server
            .handle_message(r#"{"jsonrpc":"2.0","id":0,"method":"initialize","params":{}}"#)
            .await
            .unwrap();

        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], MCP_PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], SERVER_NAME);
    }

    #[tokio::test]
    async fn test_meta_mode_lists_meta_tools_and_keeps_direct_calls() {
        let server = server(ToolMode::Meta).await;
        let list = server
            .handle_message(r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#)
            .await
            .unwrap();
        let tools = list.result.unwrap()["tools"].as_array().unwrap().len();
        assert_eq!(tools, 3);

        let call = server
            .handle_message(
                r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"execute_tool","arguments":{"toolName":"list_campaigns"}}}"#,
            )
            .await
            .unwrap();
        assert_eq!(call.result.unwrap()["echo"]["name"], "list_campaigns");

        let direct = server
            .handle_message(r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"ads_list_campaigns"}}"#)
            .await
            .unwrap();
        assert!(direct.result.is_some());
    }
}
