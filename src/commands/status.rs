use colored::Colorize;

use super::Session;
use crate::config::Config;
use crate::error::Result;

/// Report whether the remote session is reachable and signed in.
pub async fn run_status(config: &Config) -> Result<()> {
    let session = Session::start(config).await?;
    let outcome = session.bridge().check_status().await;
    session.shutdown().await;

    match outcome {
        Ok(status) if status.is_connected() => {
            println!("{} ({})", "connected".green().bold(), config.remote.base_url);
        }
        Ok(status) => {
            println!(
                "{} (logged in: {}, access: {})",
                "not connected".red().bold(),
                status.is_logged_in,
                status.has_access
            );
        }
        Err(e) => {
            println!("{}: {}", "not connected".red().bold(), e);
        }
    }

    Ok(())
}
