pub mod backend;
pub mod cache;
pub mod client;
pub mod types;

pub use backend::BackendRegistry;
pub use cache::{compact_description, ToolCache};
pub use client::{BackendClient, HttpBackendClient};
pub use types::{BackendHealth, BackendSummary, PrefixedTool, RefreshOutcome, RouterStats};
