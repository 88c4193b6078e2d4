use colored::Colorize;
use rustyline::DefaultEditor;

use super::open_storage;
use crate::cli::SettingsCommand;
use crate::config::Config;
use crate::error::{Result, SweepError};
use crate::storage::{AppSettings, SettingsPatch};

/// Handle settings commands
pub fn handle_settings(config: &Config, command: SettingsCommand) -> Result<()> {
    let storage = open_storage(config)?;

    match command {
        SettingsCommand::Show { json } => {
            let settings = storage.settings()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&settings)?);
            } else {
                print_settings(&settings);
            }
        }
        SettingsCommand::Set {
            hide_ignored,
            language,
            delete_delay,
            max_logs,
        } => {
            let patch = SettingsPatch {
                hide_ignored,
                language,
                delete_delay,
                max_logs,
            };
            if patch.is_empty() {
                return Err(SweepError::Config("No settings given to update".to_string()).into());
            }
            if patch.max_logs == Some(0) {
                return Err(SweepError::Config("max_logs must be greater than 0".to_string()).into());
            }
            let settings = storage.update_settings(patch)?;
            println!("{}", "Settings updated.".green());
            print_settings(&settings);
        }
        SettingsCommand::Reset { yes } => {
            if !yes && !confirm_reset()? {
                println!("Reset aborted.");
                return Ok(());
            }
            storage.clear_all()?;
            tracing::info!("Stored data reset to defaults");
            println!("{}", "All stored data erased; settings restored to defaults.".green());
        }
    }

    Ok(())
}

/// Ask for a yes/no answer before erasing stored data.
fn confirm_reset() -> Result<bool> {
    let mut rl = DefaultEditor::new()?;
    match rl.readline("Erase the ignore list, operation log and settings? [y/N] ") {
        Ok(line) => Ok(matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")),
        Err(rustyline::error::ReadlineError::Interrupted)
        | Err(rustyline::error::ReadlineError::Eof) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

fn print_settings(settings: &AppSettings) {
    println!("  {:<14} {}", "hideIgnored", settings.hide_ignored);
    println!("  {:<14} {}", "language", settings.language);
    println!("  {:<14} {} ms", "deleteDelay", settings.delete_delay);
    println!("  {:<14} {}", "maxLogs", settings.max_logs);
}
