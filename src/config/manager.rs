use crate::config::Config;
use crate::utils::errors::{RouterError, RouterResult};
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use figment::Figment;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Prefix for environment overrides, e.g. `MCP_ROUTER_ROUTER__HTTP_PORT=8080`
pub const ENV_PREFIX: &str = "MCP_ROUTER_";

/// Supported config file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
    Yaml,
}

impl ConfigFormat {
    /// Detect format from file extension, TOML otherwise
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => ConfigFormat::Json,
            Some("yml") | Some("yaml") => ConfigFormat::Yaml,
            _ => ConfigFormat::Toml,
        }
    }
}

/// Loads the layered router configuration:
/// defaults, then the config file (if any), then environment variables.
pub struct ConfigManager {
    path: Option<PathBuf>,
    config: Config,
}

impl ConfigManager {
    pub fn load(path: Option<&str>) -> RouterResult<Self> {
        let path = path.map(|p| PathBuf::from(shellexpand::tilde(p).to_string()));

        let mut figment = Figment::from(Serialized::defaults(Config::default()));

        if let Some(path) = &path {
            if !path.exists() {
                return Err(RouterError::Configuration(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            let format = ConfigFormat::from_path(path);
            debug!("Detected config format: {:?}", format);
            figment = match format {
                ConfigFormat::Toml => figment.merge(Toml::file(path)),
                ConfigFormat::Json => figment.merge(Json::file(path)),
                ConfigFormat::Yaml => figment.merge(Yaml::file(path)),
            };
        }

        let figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        let config: Config = figment
            .extract()
            .map_err(|e| RouterError::Configuration(format!("Failed to load config: {}", e)))?;

        info!(
            backends = config.backends.len(),
            transport = ?config.router.transport,
            "Router configuration loaded"
        );

        Ok(Self { path, config })
    }

    /// Parse a config from an in-memory TOML string, without env overrides.
    pub fn from_toml_str(content: &str) -> RouterResult<Config> {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::string(content))
            .extract()
            .map_err(|e| RouterError::Configuration(format!("TOML parse error: {}", e)))
    }

    pub fn get_config(&self) -> Config {
        self.config.clone()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ToolMode, TransportMode};
    use tempfile::TempDir;

    #[test]
    fn test_load_toml_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("router.toml");
        let content = r#"
[router]
http_port = 8080
transport = "http"
tool_mode = "meta"

[[backends]]
name = "ads"
base_url = "http://localhost:9001"
prefix = "ads_"
timeout_ms = 5000
"#;
        std::fs::write(&config_path, content).unwrap();

        let manager = ConfigManager::load(config_path.to_str()).unwrap();
        let config = manager.get_config();
        assert_eq!(config.router.http_port, 8080);
        assert_eq!(config.router.transport, TransportMode::Http);
        assert_eq!(config.router.tool_mode, ToolMode::Meta);
        assert_eq!(config.backends.len(), 1);
        assert_eq!(config.backends[0].prefix, "ads_");
        assert!(config.backends[0].active);
        assert_eq!(config.backends[0].timeout_ms, Some(5000));
    }

    #[test]
    fn test_load_json_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("router.json");
        let content = r#"{"backends": [{"name": "gsc", "base_url": "http://localhost:9002", "prefix": "gsc_", "active": false}]}"#;
        std::fs::write(&config_path, content).unwrap();

        let manager = ConfigManager::load(config_path.to_str()).unwrap();
        let config = manager.get_config();
        assert_eq!(config.router.http_port, 3000);
        assert_eq!(config.backends[0].name, "gsc");
        assert!(!config.backends[0].active);
    }

    #[test]
    fn test_missing_file_is_configuration_error() {
        let result = ConfigManager::load(Some("/nonexistent/router.toml"));
        assert!(matches!(result, Err(RouterError::Configuration(_))));
    }

    #[test]
    fn test_config_format_detection() {
        let cases = vec![
            ("router.json", ConfigFormat::Json),
            ("router.yaml", ConfigFormat::Yaml),
            ("router.yml", ConfigFormat::Yaml),
            ("router.toml", ConfigFormat::Toml),
            ("router", ConfigFormat::Toml),
        ];
        for (path, expected) in cases {
            assert_eq!(ConfigFormat::from_path(Path::new(path)), expected, "Failed for: {}", path);
        }
    }
}
