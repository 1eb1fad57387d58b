use clap::Parser;
use mcp_router::cli::{self, Cli};
use mcp_router::config::ConfigManager;
use mcp_router::utils::{init_logging, ShutdownCoordinator};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli {
        Cli::Serve(args) => {
            let manager = ConfigManager::load(args.config.as_deref())?;
            let mut config = manager.get_config();
            args.apply(&mut config);

            init_logging(&config.logging.level, config.logging.format);

            info!(version = env!("CARGO_PKG_VERSION"), "Starting mcp-router");
            match manager.path() {
                Some(path) => info!("Config file: {}", path.display()),
                None => info!("No config file given, using defaults and environment"),
            }

            cli::serve::run(config, ShutdownCoordinator::new()).await?;
        }
        Cli::Validate(args) => {
            cli::validate_command(&args)?;
        }
        Cli::Schema => {
            cli::schema_command();
        }
    }

    Ok(())
}
