//! CLI command implementations

pub mod args;
pub mod serve;

pub use args::{Cli, ServeArgs, ValidateArgs};

use crate::config::{ConfigManager, ConfigValidator};
use crate::utils::errors::{RouterError, RouterResult};

/// Load and validate a config file, printing every problem found.
pub fn validate_command(args: &ValidateArgs) -> RouterResult<()> {
    let manager = ConfigManager::load(Some(args.config.as_str()))?;
    let config = manager.get_config();

    match ConfigValidator::new().validate_config(&config) {
        Ok(()) => {
            println!(
                "Configuration is valid: {} backend(s), transport {:?}",
                config.backends.len(),
                config.router.transport
            );
            Ok(())
        }
        Err(errors) => {
            for error in &errors {
                eprintln!("  {}", error);
            }
            Err(RouterError::Configuration(format!(
                "{} validation error(s) in {}",
                errors.len(),
                args.config
            )))
        }
    }
}

/// Print the JSON schema of the configuration file.
pub fn schema_command() {
    println!("{}", ConfigValidator::new().export_schema());
}
