//! mcp-router: one MCP endpoint in front of many backend MCP servers

pub mod cli;
pub mod config;
pub mod core;
pub mod http_server;
pub mod registry;
pub mod transport;
pub mod utils;

pub use config::Config;
pub use crate::core::RouterServer;
pub use registry::BackendRegistry;
pub use utils::errors::{RouterError, RouterResult};
