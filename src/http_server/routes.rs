use crate::core::RouterServer;
use crate::registry::{BackendSummary, RouterStats};
use crate::utils::errors::RouterResult;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

/// JSON-RPC endpoint; notifications are acknowledged with 202
pub async fn mcp_handler(State(server): State<Arc<RouterServer>>, body: String) -> Response {
    match server.handle_message(&body).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// Latest health snapshot, or a fresh pass when none was recorded yet
pub async fn health(State(server): State<Arc<RouterServer>>) -> (StatusCode, Json<Value>) {
    let report = match server.latest_health() {
        Some(report) => report,
        None => server.check_health().await,
    };

    let healthy = report.iter().all(|h| h.reachable);
    let stats = server.get_stats();
    let status = if healthy { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };

    (
        status,
        Json(json!({
            "status": if healthy { "healthy" } else { "degraded" },
            "version": env!("CARGO_PKG_VERSION"),
            "uptimeMs": stats.uptime_ms,
            "totalTools": stats.total_tools,
            "backends": report,
        })),
    )
}

pub async fn stats(State(server): State<Arc<RouterServer>>) -> Json<RouterStats> {
    Json(server.get_stats())
}

/// Refresh every active backend, best effort
pub async fn refresh(State(server): State<Arc<RouterServer>>) -> Json<Value> {
    info!("Admin requested tool refresh");
    let outcomes = server.registry().refresh_all_tools().await;
    let failed = outcomes.iter().filter(|o| !o.is_success()).count();

    Json(json!({
        "succeeded": outcomes.len() - failed,
        "failed": failed,
        "totalTools": server.registry().tool_count(),
        "results": outcomes,
    }))
}

pub async fn list_backends(State(server): State<Arc<RouterServer>>) -> Json<Vec<BackendSummary>> {
    Json(server.registry().backend_summaries())
}

pub async fn activate_backend(
    Path(name): Path<String>,
    State(server): State<Arc<RouterServer>>,
) -> RouterResult<Json<Value>> {
    let tool_count = server.registry().activate_backend(&name).await?;

    Ok(Json(json!({
        "name": name,
        "active": true,
        "toolCount": tool_count,
    })))
}

pub async fn deactivate_backend(
    Path(name): Path<String>,
    State(server): State<Arc<RouterServer>>,
) -> RouterResult<Json<Value>> {
    server.registry().deactivate_backend(&name)?;

    Ok(Json(json!({
        "name": name,
        "active": false,
    })))
}
