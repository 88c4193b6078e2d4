//! Chatsweep - batch conversation cleanup CLI
//!
#![doc = "Main entry point for the Chatsweep application."]

use anyhow::Result;

use chatsweep::cli::{Cli, Commands};
use chatsweep::commands;
use chatsweep::commands::delete::DeleteArgs;
use chatsweep::config::Config;
use chatsweep::logging::{init_logging, LoggingConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    init_logging(&LoggingConfig {
        level: cli.log_directive().to_string(),
        json_format: cli.json_logs,
    })?;

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    match cli.command {
        Commands::Status => {
            tracing::debug!("Checking remote session status");
            commands::status::run_status(&config).await?;
        }
        Commands::List {
            offset,
            limit,
            query,
            json,
        } => {
            tracing::debug!(offset, limit, "Listing conversations");
            commands::list::run_list(&config, offset, limit, query, json).await?;
        }
        Commands::Delete {
            ids,
            page,
            all,
            offset,
            limit,
            query,
            yes,
        } => {
            let args = DeleteArgs {
                ids,
                page,
                all,
                offset,
                limit,
                query,
                yes,
            };
            tracing::info!(kind = %args.kind(), "Starting batch delete");
            commands::delete::run_delete(&config, args).await?;
        }
        Commands::Ignore { command } => {
            commands::ignore::handle_ignore(&config, command)?;
        }
        Commands::Logs { command } => {
            commands::logs::handle_logs(&config, command)?;
        }
        Commands::Settings { command } => {
            commands::settings::handle_settings(&config, command)?;
        }
    }

    Ok(())
}
