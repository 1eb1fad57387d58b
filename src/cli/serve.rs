//! Router startup and the `serve` command

use crate::config::{Config, ConfigValidator};
use crate::core::{BackgroundTasks, RouterServer};
use crate::http_server::HttpServer;
use crate::registry::{BackendClient, BackendRegistry, HttpBackendClient};
use crate::transport::stdio::serve_stdio;
use crate::utils::errors::{RouterError, RouterResult};
use crate::utils::shutdown::ShutdownCoordinator;
use futures::future::join_all;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Build the registry from config and bring active backends online.
///
/// Invalid or colliding backends are logged and skipped; a backend that
/// fails its first refresh stays registered and active.
pub async fn bootstrap(config: &Config, client: Arc<dyn BackendClient>) -> Arc<RouterServer> {
    let registry = Arc::new(
        BackendRegistry::new(client).with_compact_descriptions(config.router.compact_descriptions),
    );

    for backend in &config.backends {
        let problems = ConfigValidator::validate_backend(backend);
        if !problems.is_empty() {
            for problem in &problems {
                error!(path = %problem.path, "{}", problem.message);
            }
            warn!(backend = %backend.name, "Skipping invalid backend");
            continue;
        }
        if let Err(e) = registry.register_backend(backend.clone()) {
            error!(backend = %backend.name, error = %e, "Failed to register backend");
        }
    }

    let active = registry.list_active_backends();
    info!(
        registered = registry.list_backends().len(),
        active = active.len(),
        "Activating backends"
    );

    let results = join_all(active.iter().map(|backend| {
        let registry = registry.clone();
        async move { (backend.name.clone(), registry.activate_backend(&backend.name).await) }
    }))
    .await;

    for (name, result) in results {
        match result {
            Ok(count) => info!(backend = %name, tools = count, "Backend online"),
            Err(e) => error!(backend = %name, error = %e, "Backend failed initial tool refresh"),
        }
    }

    info!(total_tools = registry.tool_count(), "Router catalog ready");
    Arc::new(RouterServer::new(registry, config.router.tool_mode))
}

/// Run the router until shutdown.
pub async fn run(config: Config, shutdown: ShutdownCoordinator) -> RouterResult<()> {
    let transport = config.router.transport;
    let client: Arc<dyn BackendClient> = Arc::new(HttpBackendClient::new()?);
    let server = bootstrap(&config, client).await;

    let tasks = BackgroundTasks::start(server.clone(), &config.router, &shutdown);

    let mut transports: JoinSet<(&'static str, RouterResult<()>)> = JoinSet::new();
    if transport.serves_http() {
        let http = HttpServer::new(server.clone(), config.router.http_host.clone(), config.router.http_port);
        let signal = shutdown.subscribe();
        transports.spawn(async move { ("http", http.run(signal).await) });
    }
    if transport.serves_stdio() {
        let signal = shutdown.subscribe();
        let server = server.clone();
        transports.spawn(async move { ("stdio", serve_stdio(server, signal).await) });
    }

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { shutdown.wait_for_shutdown_signal().await });
    }

    let mut failure = None;
    while let Some(joined) = transports.join_next().await {
        let (name, result) = joined.map_err(|e| RouterError::Internal(format!("transport task failed: {}", e)))?;
        match result {
            Ok(()) => info!(transport = name, "Transport finished"),
            Err(e) => {
                error!(transport = name, error = %e, "Transport failed");
                failure.get_or_insert(e);
            }
        }

        // stdin closing ends a stdio-only router; with HTTP it keeps serving
        let stop = failure.is_some() || name == "http" || !transport.serves_http();
        if stop && !shutdown.is_shutdown() {
            shutdown.shutdown();
        }
    }

    if !shutdown.is_shutdown() {
        shutdown.shutdown();
    }
    tasks.join().await;
    info!("Router stopped");

    failure.map_or(Ok(()), Err)
}
