pub mod manager;
pub mod types;
pub mod validation;

pub use manager::ConfigManager;
pub use types::*;
pub use validation::ConfigValidator;
