//! CLI argument types - shared between binary and tests

use crate::config::{Config, LogFormat, ToolMode, TransportMode};
use clap::Parser;

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
pub enum TransportModeCli {
    /// Newline-delimited JSON-RPC on stdin/stdout
    Stdio,
    /// JSON-RPC over HTTP POST /mcp
    Http,
    /// Both transports at once
    Both,
}

impl From<TransportModeCli> for TransportMode {
    fn from(val: TransportModeCli) -> Self {
        match val {
            TransportModeCli::Stdio => TransportMode::Stdio,
            TransportModeCli::Http => TransportMode::Http,
            TransportModeCli::Both => TransportMode::Both,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
pub enum ToolModeCli {
    /// List every prefixed backend tool
    Direct,
    /// List only the search/schema/execute meta tools
    Meta,
}

impl From<ToolModeCli> for ToolMode {
    fn from(val: ToolModeCli) -> Self {
        match val {
            ToolModeCli::Direct => ToolMode::Direct,
            ToolModeCli::Meta => ToolMode::Meta,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
pub enum LogFormatCli {
    Json,
    Pretty,
}

impl From<LogFormatCli> for LogFormat {
    fn from(val: LogFormatCli) -> Self {
        match val {
            LogFormatCli::Json => LogFormat::Json,
            LogFormatCli::Pretty => LogFormat::Pretty,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "mcp-router")]
#[command(about = "Aggregate backend MCP servers behind one prefixed tool catalog")]
#[command(version)]
pub enum Cli {
    /// Start the router
    Serve(ServeArgs),
    /// Validate a configuration file
    Validate(ValidateArgs),
    /// Print the configuration JSON schema
    Schema,
}

#[derive(Parser, Debug, Default)]
pub struct ServeArgs {
    /// Configuration file path (TOML, JSON or YAML)
    #[arg(short, long, env = "MCP_ROUTER_CONFIG")]
    pub config: Option<String>,
    /// Which client transports to open
    #[arg(short, long, value_enum)]
    pub transport: Option<TransportModeCli>,
    /// Host for the HTTP transport
    #[arg(short = 'H', long)]
    pub host: Option<String>,
    /// Port for the HTTP transport
    #[arg(short, long)]
    pub port: Option<u16>,
    /// How tools are exposed to clients
    #[arg(long, value_enum)]
    pub tool_mode: Option<ToolModeCli>,
    /// Log level or filter directive
    #[arg(short, long)]
    pub log_level: Option<String>,
    #[arg(long, value_enum)]
    pub log_format: Option<LogFormatCli>,
}

impl ServeArgs {
    /// Command-line flags win over file and environment settings.
    pub fn apply(&self, config: &mut Config) {
        if let Some(transport) = self.transport {
            config.router.transport = transport.into();
        }
        if let Some(host) = &self.host {
            config.router.http_host = host.clone();
        }
        if let Some(port) = self.port {
            config.router.http_port = port;
        }
        if let Some(mode) = self.tool_mode {
            config.router.tool_mode = mode.into();
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if let Some(format) = self.log_format {
            config.logging.format = format.into();
        }
    }
}

#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Configuration file path
    #[arg(short, long, env = "MCP_ROUTER_CONFIG")]
    pub config: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve_flags() {
        let cli = Cli::try_parse_from([
            "mcp-router",
            "serve",
            "--transport",
            "http",
            "--port",
            "8080",
            "--tool-mode",
            "meta",
        ])
        .unwrap();

        let Cli::Serve(args) = cli else {
            panic!("expected serve");
        };
        let mut config = Config::default();
        args.apply(&mut config);

        assert_eq!(config.router.transport, TransportMode::Http);
        assert_eq!(config.router.http_port, 8080);
        assert_eq!(config.router.tool_mode, ToolMode::Meta);
        assert_eq!(config.router.http_host, "127.0.0.1");
    }

    #[test]
    fn test_apply_without_flags_keeps_config() {
        let mut config = Config::default();
        config.router.http_port = 9999;
        ServeArgs::default().apply(&mut config);
        assert_eq!(config.router.http_port, 9999);
    }

    #[test]
    fn test_rejects_unknown_transport() {
        assert!(Cli::try_parse_from(["mcp-router", "serve", "--transport", "websocket"]).is_err());
    }
}
