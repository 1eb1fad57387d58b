//! Registry data model
use crate::core::protocol::ToolDescriptor;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A backend tool as seen by router clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PrefixedTool {
    /// `prefix + original_name`
    pub prefixed_name: String,
    pub original_name: String,
    pub backend_name: String,
    pub description: String,
    /// Untrimmed backend description, kept only when it differs from `description`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_description: Option<String>,
    pub input_schema: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Value>,
}

impl PrefixedTool {
    /// Wire descriptor with router metadata stripped
    pub fn to_descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.prefixed_name.clone(),
            description: Some(self.description.clone()),
            input_schema: self.input_schema.clone(),
            annotations: self.annotations.clone(),
        }
    }
}

/// Point-in-time health of one backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BackendHealth {
    pub backend_name: String,
    pub reachable: bool,
    pub latency_ms: u64,
    pub last_checked_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate router counters, computed on demand
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouterStats {
    pub total_backends: usize,
    pub active_backends: usize,
    pub total_tools: usize,
    pub tools_by_backend: BTreeMap<String, usize>,
    pub uptime_ms: u64,
}

/// Per-backend result of a catalog-wide refresh
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RefreshOutcome {
    pub backend_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RefreshOutcome {
    pub fn success(backend_name: impl Into<String>, tool_count: usize) -> Self {
        Self {
            backend_name: backend_name.into(),
            tool_count: Some(tool_count),
            error: None,
        }
    }

    pub fn failure(backend_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            backend_name: backend_name.into(),
            tool_count: None,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Admin view of a registered backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BackendSummary {
    pub name: String,
    pub base_url: String,
    pub prefix: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub active: bool,
    pub tool_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_refresh: Option<DateTime<Utc>>,
}
