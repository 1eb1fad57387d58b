//! Periodic catalog refresh and health probing
use crate::config::RouterConfig;
use crate::core::server::RouterServer;
use crate::utils::shutdown::{ShutdownCoordinator, ShutdownSignal};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Handles of the spawned background loops
pub struct BackgroundTasks {
    handles: Vec<(&'static str, JoinHandle<()>)>,
}

impl BackgroundTasks {
    /// Spawn the loops enabled in `config`. Both stop when `shutdown` fires.
    pub fn start(server: Arc<RouterServer>, config: &RouterConfig, shutdown: &ShutdownCoordinator) -> Self {
        let mut handles = Vec::new();

        if config.refresh_interval_ms > 0 {
            let period = Duration::from_millis(config.refresh_interval_ms);
            let registry = server.registry().clone();
            info!(interval_ms = config.refresh_interval_ms, "Starting tool refresh loop");

            handles.push((
                "refresh",
                spawn_periodic("refresh", period, shutdown.subscribe(), move || {
                    let registry = registry.clone();
                    async move {
                        let outcomes = registry.refresh_all_tools().await;
                        for failed in outcomes.iter().filter(|o| !o.is_success()) {
                            warn!(
                                backend = %failed.backend_name,
                                error = failed.error.as_deref().unwrap_or_default(),
                                "Periodic refresh failed"
                            );
                        }
                    }
                }),
            ));
        }

        if config.health_check_enabled && config.health_check_interval_ms > 0 {
            let period = Duration::from_millis(config.health_check_interval_ms);
            info!(interval_ms = config.health_check_interval_ms, "Starting health check loop");

            handles.push((
                "health",
                spawn_periodic("health", period, shutdown.subscribe(), move || {
                    let server = server.clone();
                    async move {
                        let report = server.check_health().await;
                        let unhealthy: Vec<&str> = report
                            .iter()
                            .filter(|h| !h.reachable)
                            .map(|h| h.backend_name.as_str())
                            .collect();
                        if unhealthy.is_empty() {
                            debug!(backends = report.len(), "All backends healthy");
                        } else {
                            warn!(unhealthy = ?unhealthy, "Some backends are unreachable");
                        }
                    }
                }),
            ));
        }

        Self { handles }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every loop to exit. Call after triggering shutdown.
    pub async fn join(self) {
        for (name, handle) in self.handles {
            if let Err(e) = handle.await {
                warn!(task = name, error = %e, "Background task ended abnormally");
            }
        }
    }
}

/// Run `work` every `period`, skipping the immediate first tick.
fn spawn_periodic<F, Fut>(name: &'static str, period: Duration, mut shutdown: ShutdownSignal, mut work: F) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                _ = ticker.tick() => {}
            }

            debug!(task = name, "Background tick");
            tokio::select! {
                _ = shutdown.recv() => break,
                _ = work() => {}
            }
        }

        info!(task = name, "Background task stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;
    use crate::registry::client::MockBackendClient;
    use crate::registry::BackendRegistry;
    use crate::config::ToolMode;
    use crate::utils::errors::RouterError;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn router(client: MockBackendClient) -> Arc<RouterServer> {
        let registry = Arc::new(BackendRegistry::new(Arc::new(client)));
        registry
            .register_backend(BackendConfig::new("ads", "http://localhost:9001", "ads_"))
            .unwrap();
        Arc::new(RouterServer::new(registry, ToolMode::Direct))
    }

    #[tokio::test]
    async fn test_refresh_loop_runs_until_shutdown() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut client = MockBackendClient::new();
        client.expect_call().returning(move |_, _, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(json!({"tools": []}))
        });

        let shutdown = ShutdownCoordinator::new();
        let config = RouterConfig {
            refresh_interval_ms: 20,
            ..RouterConfig::default()
        };
        let tasks = BackgroundTasks::start(router(client), &config, &shutdown);
        assert_eq!(tasks.len(), 1);

        tokio::time::sleep(Duration::from_millis(150)).await;
        shutdown.shutdown();
        tokio::time::timeout(Duration::from_secs(1), tasks.join())
            .await
            .unwrap();

        let seen = calls.load(Ordering::SeqCst);
        assert!(seen >= 2, "expected periodic refreshes, saw {}", seen);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(calls.load(Ordering::SeqCst), seen);
    }

    #[tokio::test]
    async fn test_health_loop_survives_failures_and_records_snapshot() {
        let mut client = MockBackendClient::new();
        client
            .expect_probe()
            .returning(|b| Err(RouterError::backend_call(&b.name, "ping", "connection failed")));

        let shutdown = ShutdownCoordinator::new();
        let config = RouterConfig {
            health_check_enabled: true,
            health_check_interval_ms: 20,
            ..RouterConfig::default()
        };
        let server = router(client);
        let tasks = BackgroundTasks::start(server.clone(), &config, &shutdown);

        tokio::time::sleep(Duration::from_millis(120)).await;
        shutdown.shutdown();
        tasks.join().await;

        let snapshot = server.latest_health().unwrap();
        assert_eq!(snapshot.len(), 1);
        assert!(!snapshot[0].reachable);
    }

    #[tokio::test]
    async fn test_disabled_loops_are_not_spawned() {
        let shutdown = ShutdownCoordinator::new();
        let tasks = BackgroundTasks::start(
            router(MockBackendClient::new()),
            &RouterConfig::default(),
            &shutdown,
        );
        assert!(tasks.is_empty());
    }
}
