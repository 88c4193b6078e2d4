//! Command-line interface definition for Chatsweep
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for listing and batch-deleting conversations and for
//! managing the ignore list, operation logs and settings.

use clap::{ArgGroup, Parser, Subcommand};
use std::path::PathBuf;

use crate::conversation::CONVERSATION_LIMIT;

/// Chatsweep - batch conversation cleanup
///
/// Lists conversations from the remote service and soft-deletes them in
/// paced batches through an authenticated session.
#[derive(Parser, Debug, Clone)]
#[command(name = "chatsweep")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Override the storage directory
    #[arg(long)]
    pub storage_path: Option<PathBuf>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Chatsweep
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Check whether the remote session is reachable and signed in
    Status,

    /// List conversations
    List {
        /// Index of the first conversation
        #[arg(long, default_value_t = 0)]
        offset: u32,

        /// Conversations per page
        #[arg(long, default_value_t = CONVERSATION_LIMIT)]
        limit: u32,

        /// Search query instead of the plain listing
        #[arg(short, long)]
        query: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete conversations in a paced batch
    #[command(group(
        ArgGroup::new("target")
            .required(true)
            .args(["ids", "page", "all"]),
    ))]
    Delete {
        /// Delete these conversation ids
        #[arg(long, num_args = 1..)]
        ids: Vec<String>,

        /// Delete every non-ignored conversation on the loaded page
        #[arg(long)]
        page: bool,

        /// Delete every non-ignored loaded conversation
        #[arg(long)]
        all: bool,

        /// Index of the first conversation to load
        #[arg(long, default_value_t = 0)]
        offset: u32,

        /// Conversations to load
        #[arg(long, default_value_t = CONVERSATION_LIMIT)]
        limit: u32,

        /// Load conversations matching a search query
        #[arg(short, long)]
        query: Option<String>,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Manage the ignore list
    Ignore {
        #[command(subcommand)]
        command: IgnoreCommand,
    },

    /// Inspect past batch operations
    Logs {
        #[command(subcommand)]
        command: LogsCommand,
    },

    /// Show or change settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },
}

/// Ignore list subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum IgnoreCommand {
    /// Exclude conversations from batch deletes
    Add {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Make conversations deletable again
    Remove {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Show ignored ids
    List,
    /// Remove every id from the ignore list
    Clear,
}

/// Operation log subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum LogsCommand {
    /// Show recorded batch operations, newest first
    List {
        /// Show per-item failures
        #[arg(long)]
        failures: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete every log entry
    Clear,
}

/// Settings subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum SettingsCommand {
    /// Print current settings
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Update one or more settings
    Set {
        /// Hide ignored conversations from listings
        #[arg(long)]
        hide_ignored: Option<bool>,

        /// UI language code
        #[arg(long)]
        language: Option<String>,

        /// Base delay between deletes in milliseconds
        #[arg(long)]
        delete_delay: Option<u64>,

        /// Maximum operation log entries kept
        #[arg(long)]
        max_logs: Option<usize>,
    },
    /// Erase the ignore list, operation log and cache, and restore default settings
    Reset {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Default filter directive for the tracing subscriber
    pub fn log_directive(&self) -> &'static str {
        if self.verbose {
            "chatsweep=debug"
        } else {
            "chatsweep=info"
        }
    }
}
