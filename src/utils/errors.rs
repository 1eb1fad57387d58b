use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RouterError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("backend not found: {0}")]
    NotFound(String),

    #[error("backend '{backend}' unreachable: {message}")]
    BackendUnreachable { backend: String, message: String },

    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("{}", backend_call_message(.backend, .method, .tool, .message))]
    BackendCall {
        backend: String,
        method: String,
        tool: Option<String>,
        message: String,
    },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn backend_call_message(backend: &str, method: &str, tool: &Option<String>, message: &str) -> String {
    match tool {
        Some(tool) => format!(
            "backend '{}' failed {} for tool '{}': {}",
            backend, method, tool, message
        ),
        None => format!("backend '{}' failed {}: {}", backend, method, message),
    }
}

impl From<anyhow::Error> for RouterError {
    fn from(e: anyhow::Error) -> Self {
        RouterError::Internal(e.to_string())
    }
}

impl RouterError {
    pub fn backend_call(
        backend: impl Into<String>,
        method: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::BackendCall {
            backend: backend.into(),
            method: method.into(),
            tool: None,
            message: message.into(),
        }
    }

    /// Attach the original tool name to a `BackendCall` error.
    pub fn with_tool(self, tool_name: &str) -> Self {
        match self {
            Self::BackendCall {
                backend,
                method,
                message,
                ..
            } => Self::BackendCall {
                backend,
                method,
                tool: Some(tool_name.to_string()),
                message,
            },
            other => other,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) | Self::UnknownTool(_) => StatusCode::NOT_FOUND,
            Self::Configuration(_) | Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::BackendUnreachable { .. } | Self::BackendCall { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::BackendUnreachable { .. } => "BACKEND_UNREACHABLE",
            Self::UnknownTool(_) => "UNKNOWN_TOOL",
            Self::BackendCall { .. } => "BACKEND_CALL_ERROR",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// JSON-RPC error code used when the error crosses the MCP boundary.
    pub fn rpc_code(&self) -> i32 {
        match self {
            Self::InvalidRequest(_) => -32600,
            Self::UnknownTool(_) => -32602,
            Self::BackendCall { .. } => -32000,
            Self::BackendUnreachable { .. } => -32001,
            Self::NotFound(_) => -32002,
            Self::Configuration(_) => -32003,
            _ => -32603,
        }
    }
}

impl IntoResponse for RouterError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": self.error_code(),
            "message": self.to_string(),
        }));

        (status, body).into_response()
    }
}

pub type RouterResult<T> = Result<T, RouterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            RouterError::UnknownTool("x".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            RouterError::backend_call("ads", "tools/call", "timeout").status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            RouterError::Configuration("dup".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_backend_call_message_includes_tool() {
        let err = RouterError::backend_call("ads", "tools/call", "connection refused")
            .with_tool("list_campaigns");
        assert_eq!(
            err.to_string(),
            "backend 'ads' failed tools/call for tool 'list_campaigns': connection refused"
        );
        assert_eq!(err.error_code(), "BACKEND_CALL_ERROR");
        assert_eq!(err.rpc_code(), -32000);
    }

    #[test]
    fn test_with_tool_leaves_other_errors_alone() {
        let err = RouterError::UnknownTool("gsc_nope".to_string()).with_tool("nope");
        assert!(matches!(err, RouterError::UnknownTool(name) if name == "gsc_nope"));
    }
}
