use colored::Colorize;
use prettytable::{format, row, Table};

use super::open_storage;
use crate::cli::LogsCommand;
use crate::config::Config;
use crate::conversation::truncate_text;
use crate::error::Result;

/// Handle operation log commands
pub fn handle_logs(config: &Config, command: LogsCommand) -> Result<()> {
    let storage = open_storage(config)?;

    match command {
        LogsCommand::List { failures, json } => {
            let logs = storage.logs()?;

            if json {
                println!("{}", serde_json::to_string_pretty(&logs)?);
                return Ok(());
            }

            if logs.is_empty() {
                println!("{}", "No operations recorded.".yellow());
                return Ok(());
            }

            let mut table = Table::new();
            table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
            table.add_row(row![
                "When".bold(),
                "Type".bold(),
                "Total".bold(),
                "Deleted".bold(),
                "Failed".bold(),
                "Status".bold()
            ]);

            for entry in &logs {
                let status = if entry.is_complete() {
                    "complete".green()
                } else {
                    "cancelled".yellow()
                };
                table.add_row(row![
                    entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    entry.kind,
                    entry.total,
                    entry.success.to_string().green(),
                    entry.failed.to_string().red(),
                    status
                ]);
            }

            println!("\nOperation log (newest first):");
            table.printstd();

            if failures {
                for entry in logs.iter().filter(|e| !e.failures.is_empty()) {
                    println!(
                        "\nFailures from {}:",
                        entry.timestamp.format("%Y-%m-%d %H:%M:%S")
                    );
                    for failure in &entry.failures {
                        println!(
                            "  {} {} - {}",
                            failure.id.cyan(),
                            truncate_text(&failure.title, 40),
                            failure.reason.red()
                        );
                    }
                }
            }
            println!();
        }
        LogsCommand::Clear => {
            storage.clear_logs()?;
            println!("{}", "Operation log cleared.".green());
        }
    }

    Ok(())
}
