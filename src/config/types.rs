use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Default per-call timeout applied when a backend does not set one
pub const DEFAULT_BACKEND_TIMEOUT_MS: u64 = 30_000;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Validate, Default)]
pub struct Config {
    #[serde(default)]
    #[validate(nested)]
    pub router: RouterConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    #[validate(nested)]
    pub backends: Vec<BackendConfig>,
}

/// Client transports the router serves
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    Stdio,
    Http,
    #[default]
    Both,
}

impl TransportMode {
    pub fn serves_stdio(self) -> bool {
        matches!(self, TransportMode::Stdio | TransportMode::Both)
    }

    pub fn serves_http(self) -> bool {
        matches!(self, TransportMode::Http | TransportMode::Both)
    }
}

impl std::str::FromStr for TransportMode {
    type Err = crate::utils::errors::RouterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "stdio" => Ok(TransportMode::Stdio),
            "http" => Ok(TransportMode::Http),
            "both" => Ok(TransportMode::Both),
            _ => Err(crate::utils::errors::RouterError::Configuration(format!(
                "Unknown transport: {}. Use 'stdio', 'http', or 'both'",
                s
            ))),
        }
    }
}

/// How the aggregated catalog is presented to clients
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ToolMode {
    /// Every prefixed backend tool is listed
    #[default]
    Direct,
    /// Only search_tools, get_tool_schema and execute_tool are listed
    Meta,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Validate)]
#[serde(default)]
pub struct RouterConfig {
    pub http_host: String,
    #[validate(range(min = 1))]
    pub http_port: u16,
    pub transport: TransportMode,
    /// Period of the catalog refresh loop; 0 disables it
    pub refresh_interval_ms: u64,
    pub health_check_enabled: bool,
    #[validate(range(min = 100))]
    pub health_check_interval_ms: u64,
    pub tool_mode: ToolMode,
    /// Keep only the first line of backend tool descriptions
    pub compact_descriptions: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            http_host: "127.0.0.1".to_string(),
            http_port: 3000,
            transport: TransportMode::Both,
            refresh_interval_ms: 0,
            health_check_enabled: false,
            health_check_interval_ms: 60_000,
            tool_mode: ToolMode::Direct,
            compact_descriptions: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// One backend MCP server reachable over HTTP
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Validate, PartialEq)]
pub struct BackendConfig {
    #[validate(length(min = 1, message = "Backend name is required"))]
    pub name: String,
    #[validate(url(message = "Invalid backend URL"))]
    pub base_url: String,
    /// Prepended verbatim to every tool name, e.g. `ads_`
    #[validate(custom(function = "validate_prefix"))]
    pub prefix: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub description: Option<String>,
    /// Probe target for health checks; `base_url` when unset
    #[serde(default)]
    #[validate(url(message = "Invalid health check URL"))]
    pub health_check_url: Option<String>,
}

fn default_active() -> bool {
    true
}

/// Prefixes are alphanumeric plus `_` and `-`.
fn validate_prefix(prefix: &str) -> Result<(), ValidationError> {
    if prefix.is_empty() {
        let mut err = ValidationError::new("required");
        err.message = Some("Backend prefix is required".into());
        return Err(err);
    }
    if !prefix
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        let mut err = ValidationError::new("prefix_format");
        err.message = Some(
            format!(
                "Invalid prefix format: {}. Use alphanumeric, underscores, or hyphens.",
                prefix
            )
            .into(),
        );
        return Err(err);
    }
    Ok(())
}

impl BackendConfig {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            prefix: prefix.into(),
            active: true,
            timeout_ms: None,
            description: None,
            health_check_url: None,
        }
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn health_url(&self) -> &str {
        self.health_check_url.as_deref().unwrap_or(&self.base_url)
    }

    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout_ms.unwrap_or(DEFAULT_BACKEND_TIMEOUT_MS))
    }
}
