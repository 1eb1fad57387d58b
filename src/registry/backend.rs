//! Backend registry
//!
//! Single source of truth for which backends exist, whether they are
//! active, and which tools they currently expose. Network calls happen
//! outside the state lock; every cache mutation is one synchronous step
//! taken after the awaited call returns.
use crate::config::{BackendConfig, ConfigValidator};
use crate::core::protocol::{ListToolsResult, ToolDescriptor};
use crate::registry::cache::{compact_description, ToolCache};
use crate::registry::client::{BackendClient, HttpBackendClient};
use crate::registry::types::{BackendHealth, BackendSummary, PrefixedTool, RefreshOutcome, RouterStats};
use crate::utils::errors::{RouterError, RouterResult};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use parking_lot::RwLock;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Upper bound on `nextCursor` pages followed during one refresh
const MAX_LIST_PAGES: usize = 100;

struct BackendEntry {
    config: BackendConfig,
    last_refresh: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct RegistryState {
    /// Registration order
    backends: Vec<BackendEntry>,
    cache: ToolCache,
}

impl RegistryState {
    fn entry(&self, name: &str) -> Option<&BackendEntry> {
        self.backends.iter().find(|b| b.config.name == name)
    }

    fn entry_mut(&mut self, name: &str) -> Option<&mut BackendEntry> {
        self.backends.iter_mut().find(|b| b.config.name == name)
    }

    fn ordered_tools(&self) -> Vec<PrefixedTool> {
        self.cache
            .tools_in_order(self.backends.iter().map(|b| b.config.name.as_str()))
    }
}

/// Registry of backend MCP servers and their prefixed tools
pub struct BackendRegistry {
    state: RwLock<RegistryState>,
    client: Arc<dyn BackendClient>,
    compact_descriptions: bool,
}

impl BackendRegistry {
    pub fn new(client: Arc<dyn BackendClient>) -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
            client,
            compact_descriptions: true,
        }
    }

    /// Registry talking to backends over HTTP
    pub fn with_http_client() -> RouterResult<Self> {
        Ok(Self::new(Arc::new(HttpBackendClient::new()?)))
    }

    pub fn with_compact_descriptions(mut self, enabled: bool) -> Self {
        self.compact_descriptions = enabled;
        self
    }

    /// Insert or replace a backend by name. No network I/O.
    ///
    /// Replacing keeps the registration position and purges cached tools.
    pub fn register_backend(&self, config: BackendConfig) -> RouterResult<()> {
        let problems = ConfigValidator::validate_backend(&config);
        if !problems.is_empty() {
            let joined = problems.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(", ");
            return Err(RouterError::Configuration(format!(
                "Invalid backend config for {}: {}",
                config.name, joined
            )));
        }

        let mut state = self.state.write();

        if let Some(other) = state
            .backends
            .iter()
            .find(|b| b.config.name != config.name && b.config.prefix == config.prefix)
        {
            return Err(RouterError::Configuration(format!(
                "Prefix '{}' of backend '{}' is already used by backend '{}'",
                config.prefix, config.name, other.config.name
            )));
        }

        info!(
            backend = %config.name,
            url = %config.base_url,
            prefix = %config.prefix,
            active = config.active,
            "Registering backend"
        );

        let name = config.name.clone();
        match state.entry_mut(&name) {
            Some(existing) => {
                existing.config = config;
                existing.last_refresh = None;
                state.cache.remove_backend(&name);
            }
            None => state.backends.push(BackendEntry {
                config,
                last_refresh: None,
            }),
        }

        Ok(())
    }

    pub fn get_backend(&self, name: &str) -> Option<BackendConfig> {
        self.state.read().entry(name).map(|b| b.config.clone())
    }

    pub fn list_backends(&self) -> Vec<BackendConfig> {
        self.state.read().backends.iter().map(|b| b.config.clone()).collect()
    }

    pub fn list_active_backends(&self) -> Vec<BackendConfig> {
        self.state
            .read()
            .backends
            .iter()
            .filter(|b| b.config.active)
            .map(|b| b.config.clone())
            .collect()
    }

    pub fn backend_summaries(&self) -> Vec<BackendSummary> {
        let state = self.state.read();
        state
            .backends
            .iter()
            .map(|b| BackendSummary {
                name: b.config.name.clone(),
                base_url: b.config.base_url.clone(),
                prefix: b.config.prefix.clone(),
                description: b.config.description.clone(),
                active: b.config.active,
                tool_count: state.cache.backend_tools(&b.config.name).len(),
                last_refresh: b.last_refresh,
            })
            .collect()
    }

    /// Mark a backend active and fetch its tools.
    ///
    /// A failed fetch leaves the backend active with its previous cache and
    /// returns the error.
    pub async fn activate_backend(&self, name: &str) -> RouterResult<usize> {
        {
            let mut state = self.state.write();
            let entry = state
                .entry_mut(name)
                .ok_or_else(|| RouterError::NotFound(name.to_string()))?;
            entry.config.active = true;
        }
        info!(backend = %name, "Activated backend");

        self.refresh_backend_tools(name).await
    }

    /// Mark a backend inactive and purge its tools. No network I/O.
    pub fn deactivate_backend(&self, name: &str) -> RouterResult<()> {
        let mut state = self.state.write();
        let entry = state
            .entry_mut(name)
            .ok_or_else(|| RouterError::NotFound(name.to_string()))?;
        entry.config.active = false;
        let removed = state.cache.remove_backend(name);

        info!(backend = %name, removed, "Deactivated backend");
        Ok(())
    }

    /// Fetch `tools/list` from one backend and swap its cache slice.
    ///
    /// Returns the number of tools now cached for the backend. On failure
    /// the existing slice is left untouched.
    pub async fn refresh_backend_tools(&self, name: &str) -> RouterResult<usize> {
        let config = self
            .get_backend(name)
            .ok_or_else(|| RouterError::NotFound(name.to_string()))?;

        if !config.active {
            warn!(backend = %name, "Cannot refresh tools for inactive backend");
            return Ok(0);
        }

        info!(backend = %name, "Refreshing tools from backend");

        let descriptors = self.fetch_tool_list(&config).await.map_err(|e| {
            error!(backend = %name, error = %e, "Failed to refresh tools");
            RouterError::BackendUnreachable {
                backend: name.to_string(),
                message: e.to_string(),
            }
        })?;

        let tools: Vec<PrefixedTool> = descriptors
            .into_iter()
            .map(|d| self.prefix_tool(&config, d))
            .collect();

        let mut state = self.state.write();
        let still_current = state
            .entry(name)
            .is_some_and(|b| b.config == config);
        if !still_current {
            warn!(backend = %name, "Backend changed during refresh, discarding fetched tools");
            return Ok(state.cache.backend_tools(name).len());
        }

        let count = state.cache.replace_backend(name, tools);
        if let Some(entry) = state.entry_mut(name) {
            entry.last_refresh = Some(Utc::now());
        }

        let sample: Vec<&str> = state
            .cache
            .backend_tools(name)
            .iter()
            .take(3)
            .map(|t| t.prefixed_name.as_str())
            .collect();
        info!(backend = %name, prefix = %config.prefix, count, sample = ?sample, "Cached prefixed tools");

        Ok(count)
    }

    /// Refresh every active backend concurrently, best effort.
    ///
    /// Outcomes follow registration order; one failure never stops the rest.
    pub async fn refresh_all_tools(&self) -> Vec<RefreshOutcome> {
        let active: Vec<String> = self.list_active_backends().into_iter().map(|b| b.name).collect();
        info!(backends = active.len(), "Refreshing tools from all active backends");

        let outcomes = join_all(active.iter().map(|name| async move {
            match self.refresh_backend_tools(name).await {
                Ok(count) => RefreshOutcome::success(name.clone(), count),
                Err(e) => RefreshOutcome::failure(name.clone(), e.to_string()),
            }
        }))
        .await;

        let failed = outcomes.iter().filter(|o| !o.is_success()).count();
        info!(total_tools = self.tool_count(), failed, "Tool refresh finished");
        outcomes
    }

    /// Snapshot of the aggregated catalog
    pub fn get_all_tools(&self) -> Vec<PrefixedTool> {
        self.state.read().ordered_tools()
    }

    pub fn get_tool(&self, prefixed_name: &str) -> Option<PrefixedTool> {
        self.state.read().cache.get(prefixed_name).cloned()
    }

    pub fn get_tools_by_backend(&self, name: &str) -> Vec<PrefixedTool> {
        self.state.read().cache.backend_tools(name).to_vec()
    }

    pub fn tool_count(&self) -> usize {
        self.state.read().cache.len()
    }

    /// Probe every registered backend concurrently.
    pub async fn check_all_backends_health(&self) -> Vec<BackendHealth> {
        let backends = self.list_backends();

        join_all(backends.iter().map(|backend| async move {
            let started = Instant::now();
            let result = self.client.probe(backend).await;
            let latency_ms = started.elapsed().as_millis() as u64;

            BackendHealth {
                backend_name: backend.name.clone(),
                reachable: result.is_ok(),
                latency_ms,
                last_checked_at: Utc::now(),
                error: result.err().map(|e| e.to_string()),
            }
        }))
        .await
    }

    /// Forward a prefixed tool call to its backend.
    ///
    /// No retries; the backend result is returned unmodified.
    pub async fn call_tool(&self, prefixed_name: &str, args: Value) -> RouterResult<Value> {
        let (tool, backend) = {
            let state = self.state.read();
            let tool = state
                .cache
                .get(prefixed_name)
                .cloned()
                .ok_or_else(|| RouterError::UnknownTool(prefixed_name.to_string()))?;
            let backend = state
                .entry(&tool.backend_name)
                .filter(|b| b.config.active)
                .map(|b| b.config.clone())
                .ok_or_else(|| RouterError::UnknownTool(prefixed_name.to_string()))?;
            (tool, backend)
        };

        info!(
            prefixed_name,
            original_name = %tool.original_name,
            backend = %backend.name,
            "Routing tool call to backend"
        );

        let params = json!({
            "name": tool.original_name,
            "arguments": args,
        });

        self.client
            .call(&backend, "tools/call", Some(params))
            .await
            .map_err(|e| e.with_tool(&tool.original_name))
    }

    /// Counters over current state; no I/O.
    pub fn get_stats(&self, start_time: Instant) -> RouterStats {
        let state = self.state.read();

        let tools_by_backend: BTreeMap<String, usize> = state
            .backends
            .iter()
            .map(|b| (b.config.name.clone(), state.cache.backend_tools(&b.config.name).len()))
            .collect();

        RouterStats {
            total_backends: state.backends.len(),
            active_backends: state.backends.iter().filter(|b| b.config.active).count(),
            total_tools: state.cache.len(),
            tools_by_backend,
            uptime_ms: start_time.elapsed().as_millis() as u64,
        }
    }

    async fn fetch_tool_list(&self, config: &BackendConfig) -> RouterResult<Vec<ToolDescriptor>> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_LIST_PAGES {
            let params = cursor.as_ref().map(|c| json!({ "cursor": c }));
            let result = self.client.call(config, "tools/list", params).await?;
            let page: ListToolsResult = serde_json::from_value(result).map_err(|e| {
                RouterError::backend_call(&config.name, "tools/list", format!("unexpected result shape: {}", e))
            })?;

            debug!(backend = %config.name, received = page.tools.len(), "Received tools page");
            tools.extend(page.tools);

            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => return Ok(tools),
            }
        }

        warn!(backend = %config.name, "Stopped following tools/list pages after {} pages", MAX_LIST_PAGES);
        Ok(tools)
    }

    fn prefix_tool(&self, config: &BackendConfig, descriptor: ToolDescriptor) -> PrefixedTool {
        let raw = descriptor.description.unwrap_or_default();
        let (description, full_description) = if self.compact_descriptions {
            let compact = compact_description(&raw);
            let full = (compact != raw).then_some(raw);
            (compact, full)
        } else {
            (raw, None)
        };

        PrefixedTool {
            prefixed_name: format!("{}{}", config.prefix, descriptor.name),
            original_name: descriptor.name,
            backend_name: config.name.clone(),
            description,
            full_description,
            input_schema: descriptor.input_schema,
            annotations: descriptor.annotations,
        }
    }
}
