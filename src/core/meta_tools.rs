//! Meta tools for large catalogs
//!
//! In meta mode clients see three small tools instead of every backend
//! tool, and discover the rest on demand.
use crate::core::protocol::ToolDescriptor;
use crate::registry::{BackendRegistry, PrefixedTool};
use crate::utils::errors::{RouterError, RouterResult};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

pub const SEARCH_TOOLS: &str = "search_tools";
pub const GET_TOOL_SCHEMA: &str = "get_tool_schema";
pub const EXECUTE_TOOL: &str = "execute_tool";

const DEFAULT_SEARCH_LIMIT: usize = 50;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchArgs {
    query: Option<String>,
    backend: Option<String>,
    #[serde(default)]
    detail_level: DetailLevel,
    limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
enum DetailLevel {
    Minimal,
    #[default]
    Full,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SchemaArgs {
    tool_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecuteArgs {
    tool_name: String,
    #[serde(default)]
    params: Option<Value>,
}

pub fn is_meta_tool(name: &str) -> bool {
    matches!(name, SEARCH_TOOLS | GET_TOOL_SCHEMA | EXECUTE_TOOL)
}

/// Descriptors advertised by `tools/list` in meta mode
pub fn meta_tool_descriptors() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor {
            name: SEARCH_TOOLS.to_string(),
            description: Some("Search available backend tools by keyword or backend".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "Keyword matched against tool names and descriptions"},
                    "backend": {"type": "string", "description": "Only tools of this backend"},
                    "detailLevel": {"type": "string", "enum": ["minimal", "full"]},
                    "limit": {"type": "integer", "minimum": 1}
                }
            }),
            annotations: None,
        },
        ToolDescriptor {
            name: GET_TOOL_SCHEMA.to_string(),
            description: Some("Get the full input schema and documentation for one tool".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "toolName": {"type": "string", "description": "Prefixed or original tool name"}
                },
                "required": ["toolName"]
            }),
            annotations: None,
        },
        ToolDescriptor {
            name: EXECUTE_TOOL.to_string(),
            description: Some("Execute a discovered tool with parameters".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "toolName": {"type": "string", "description": "Prefixed or original tool name"},
                    "params": {"type": "object", "description": "Arguments passed to the tool"}
                },
                "required": ["toolName"]
            }),
            annotations: None,
        },
    ]
}

/// Run one meta tool against the registry.
pub async fn call_meta_tool(registry: &BackendRegistry, name: &str, args: Value) -> RouterResult<Value> {
    match name {
        SEARCH_TOOLS => {
            let args: SearchArgs = parse_args(name, args)?;
            Ok(text_result(search(registry, &args)))
        }
        GET_TOOL_SCHEMA => {
            let args: SchemaArgs = parse_args(name, args)?;
            let tool = resolve(registry, &args.tool_name)?;
            info!(tool = %tool.prefixed_name, "Serving tool schema");
            Ok(text_result(json!({
                "name": tool.prefixed_name,
                "originalName": tool.original_name,
                "backend": tool.backend_name,
                "description": tool.full_description.as_deref().unwrap_or(&tool.description),
                "inputSchema": tool.input_schema,
                "annotations": tool.annotations,
            })))
        }
        EXECUTE_TOOL => {
            let args: ExecuteArgs = parse_args(name, args)?;
            let tool = resolve(registry, &args.tool_name)?;
            info!(tool = %tool.prefixed_name, "Executing tool via meta tool");
            registry
                .call_tool(&tool.prefixed_name, args.params.unwrap_or_else(|| json!({})))
                .await
        }
        other => Err(RouterError::UnknownTool(other.to_string())),
    }
}

fn parse_args<T: for<'de> Deserialize<'de>>(tool: &str, args: Value) -> RouterResult<T> {
    let args = if args.is_null() { json!({}) } else { args };
    serde_json::from_value(args)
        .map_err(|e| RouterError::InvalidRequest(format!("invalid arguments for {}: {}", tool, e)))
}

/// Prefixed name first, then the first tool with that original name.
fn resolve(registry: &BackendRegistry, name: &str) -> RouterResult<PrefixedTool> {
    registry
        .get_tool(name)
        .or_else(|| {
            registry
                .get_all_tools()
                .into_iter()
                .find(|t| t.original_name == name)
        })
        .ok_or_else(|| RouterError::UnknownTool(name.to_string()))
}

fn search(registry: &BackendRegistry, args: &SearchArgs) -> Value {
    let needle = args.query.as_deref().map(str::to_lowercase);
    let limit = args.limit.unwrap_or(DEFAULT_SEARCH_LIMIT).max(1);

    let matches: Vec<PrefixedTool> = registry
        .get_all_tools()
        .into_iter()
        .filter(|t| args.backend.as_deref().map_or(true, |b| t.backend_name == b))
        .filter(|t| match &needle {
            Some(needle) => {
                t.prefixed_name.to_lowercase().contains(needle)
                    || t.description.to_lowercase().contains(needle)
                    || t
                        .full_description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(needle))
            }
            None => true,
        })
        .collect();

    let tools: Vec<Value> = matches
        .iter()
        .take(limit)
        .map(|t| match args.detail_level {
            DetailLevel::Minimal => json!(t.prefixed_name),
            DetailLevel::Full => json!({
                "name": t.prefixed_name,
                "backend": t.backend_name,
                "description": t.description,
            }),
        })
        .collect();

    json!({
        "query": args.query,
        "backend": args.backend,
        "total": matches.len(),
        "tools": tools,
    })
}

fn text_result(payload: Value) -> Value {
    let text = payload.to_string();
    json!({
        "content": [{
            "type": "text",
            "text": text,
        }],
        "structuredContent": payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;
    use crate::registry::client::MockBackendClient;
    use std::sync::Arc;

    async fn registry() -> BackendRegistry {
        let mut client = MockBackendClient::new();
        client.expect_call().returning(|backend, _, _| {
            Ok(match backend.name.as_str() {
                "ads" => json!({"tools": [
                    {"name": "list_campaigns", "description": "List campaigns"},
                    {"name": "update_budget", "description": "Update a campaign budget"}
                ]}),
                _ => json!({"tools": [
                    {"name": "query_search_analytics", "description": "Search analytics\nDetails here"}
                ]}),
            })
        });

        let registry = BackendRegistry::new(Arc::new(client));
        registry
            .register_backend(BackendConfig::new("ads", "http://localhost:9001", "ads_"))
            .unwrap();
        registry
            .register_backend(BackendConfig::new("gsc", "http://localhost:9002", "gsc_"))
            .unwrap();
        registry.refresh_all_tools().await;
        registry
    }

    #[tokio::test]
    async fn test_search_by_keyword() {
        let registry = registry().await;
        let result = call_meta_tool(&registry, SEARCH_TOOLS, json!({"query": "CAMPAIGN"}))
            .await
            .unwrap();

        let payload = &result["structuredContent"];
        assert_eq!(payload["total"], 2);
        assert_eq!(payload["tools"][0]["name"], "ads_list_campaigns");
    }

    #[tokio::test]
    async fn test_search_by_backend_minimal() {
        let registry = registry().await;
        let result = call_meta_tool(
            &registry,
            SEARCH_TOOLS,
            json!({"backend": "gsc", "detailLevel": "minimal"}),
        )
        .await
        .unwrap();

        assert_eq!(result["structuredContent"]["tools"], json!(["gsc_query_search_analytics"]));
    }

    #[tokio::test]
    async fn test_schema_by_original_name_returns_full_description() {
        let registry = registry().await;
        let result = call_meta_tool(
            &registry,
            GET_TOOL_SCHEMA,
            json!({"toolName": "query_search_analytics"}),
        )
        .await
        .unwrap();

        let payload = &result["structuredContent"];
        assert_eq!(payload["name"], "gsc_query_search_analytics");
        assert_eq!(payload["description"], "Search analytics\nDetails here");
    }

    #[tokio::test]
    async fn test_schema_requires_tool_name() {
        let registry = registry().await;
        let err = call_meta_tool(&registry, GET_TOOL_SCHEMA, json!({})).await.unwrap_err();
        assert!(matches!(err, RouterError::InvalidRequest(_)));

        let err = call_meta_tool(&registry, GET_TOOL_SCHEMA, json!({"toolName": "nope"}))
            .await
            .unwrap_err();
        assert!(matches!(err, RouterError::UnknownTool(_)));
    }

    #[test]
    fn test_meta_descriptor_names() {
        let names: Vec<_> = meta_tool_descriptors().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec![SEARCH_TOOLS, GET_TOOL_SCHEMA, EXECUTE_TOOL]);
        assert!(is_meta_tool(EXECUTE_TOOL));
        assert!(!is_meta_tool("ads_list_campaigns"));
    }
}
