use crate::core::RouterServer;
use crate::http_server::routes;
use crate::utils::errors::{RouterError, RouterResult};
use crate::utils::shutdown::ShutdownSignal;
use axum::{
    http::Request,
    routing::{get, post},
    Router,
};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

/// MCP over HTTP plus admin endpoints
pub struct HttpServer {
    server: Arc<RouterServer>,
    host: String,
    port: u16,
}

impl HttpServer {
    pub fn new(server: Arc<RouterServer>, host: impl Into<String>, port: u16) -> Self {
        Self {
            server,
            host: host.into(),
            port,
        }
    }

    /// Serve until `shutdown` fires; in-flight requests are drained.
    pub async fn run(self, mut shutdown: ShutdownSignal) -> RouterResult<()> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|e| RouterError::Configuration(format!("Invalid http_host '{}': {}", self.host, e)))?;
        let addr = SocketAddr::from((ip, self.port));

        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("HTTP transport listening on {}", listener.local_addr()?);

        axum::serve(listener, build_router(self.server))
            .with_graceful_shutdown(async move { shutdown.recv().await })
            .await?;

        info!("HTTP transport stopped");
        Ok(())
    }
}

pub fn build_router(server: Arc<RouterServer>) -> Router {
    Router::new()
        .route("/mcp", post(routes::mcp_handler))
        .route("/health", get(routes::health))
        .route("/stats", get(routes::stats))
        .route("/admin/refresh", post(routes::refresh))
        .route("/admin/backends", get(routes::list_backends))
        .route("/admin/backends/{name}/activate", post(routes::activate_backend))
        .route("/admin/backends/{name}/deactivate", post(routes::deactivate_backend))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
            tracing::info_span!(
                "http_request",
                request_id = %Uuid::new_v4(),
                method = %request.method(),
                uri = %request.uri(),
            )
        }))
        .with_state(server)
}
