use colored::Colorize;

use super::open_storage;
use crate::cli::IgnoreCommand;
use crate::config::Config;
use crate::error::Result;

/// Handle ignore list commands
pub fn handle_ignore(config: &Config, command: IgnoreCommand) -> Result<()> {
    let storage = open_storage(config)?;

    match command {
        IgnoreCommand::Add { ids } => {
            for id in ids {
                if storage.add_to_ignore_list(&id)? {
                    println!("{}", format!("Ignoring {}", id).green());
                } else {
                    println!("{}", format!("{} is already ignored", id).yellow());
                }
            }
        }
        IgnoreCommand::Remove { ids } => {
            for id in ids {
                if storage.remove_from_ignore_list(&id)? {
                    println!("{}", format!("No longer ignoring {}", id).green());
                } else {
                    println!("{}", format!("{} was not ignored", id).yellow());
                }
            }
        }
        IgnoreCommand::List => {
            let ids = storage.ignore_list()?;
            if ids.is_empty() {
                println!("{}", "Ignore list is empty.".yellow());
                return Ok(());
            }
            println!("Ignored conversations ({}):", ids.len());
            for id in ids {
                println!("  {}", id.cyan());
            }
        }
        IgnoreCommand::Clear => {
            storage.clear_ignore_list()?;
            println!("{}", "Ignore list cleared.".green());
        }
    }

    Ok(())
}
