use std::time::Duration;

use colored::Colorize;
use prettytable::{format, row, Table};
use rustyline::DefaultEditor;
use tokio_util::sync::CancellationToken;

use super::{load_page, open_storage, Session};
use crate::batch::{BatchDeleter, DeleteProgress};
use crate::config::Config;
use crate::conversation::{confirmation_count, select_targets, title_for, truncate_text, BatchKind};
use crate::error::Result;
use crate::storage::{AppStorage, OperationLogEntry};

/// Word the user types to confirm a destructive batch.
pub const CONFIRMATION_WORD: &str = "DELETE";

/// Arguments of the `delete` command
#[derive(Debug, Clone)]
pub struct DeleteArgs {
    pub ids: Vec<String>,
    pub page: bool,
    pub all: bool,
    pub offset: u32,
    pub limit: u32,
    pub query: Option<String>,
    pub yes: bool,
}

impl DeleteArgs {
    pub fn kind(&self) -> BatchKind {
        if self.all {
            BatchKind::All
        } else if self.page {
            BatchKind::Page
        } else {
            BatchKind::Selected
        }
    }
}

/// Whether `input` confirms a destructive batch.
pub fn is_confirmed(input: &str) -> bool {
    input.trim() == CONFIRMATION_WORD
}

/// Run a confirmed batch delete with live progress.
pub async fn run_delete(config: &Config, args: DeleteArgs) -> Result<()> {
    let storage = open_storage(config)?;
    let settings = storage.settings()?;

    let session = Session::start(config).await?;
    let result = execute(&session, &storage, settings.delete_delay, &args).await;
    session.shutdown().await;

    let Some(entry) = result? else {
        return Ok(());
    };
    storage.add_log(entry.clone())?;
    print_summary(&entry);
    Ok(())
}

async fn execute(
    session: &Session,
    storage: &AppStorage,
    delete_delay: u64,
    args: &DeleteArgs,
) -> Result<Option<OperationLogEntry>> {
    let kind = args.kind();
    session.ensure_connected().await?;
    let bridge = session.bridge();
    let loaded = load_page(
        &bridge,
        storage,
        args.offset,
        args.limit,
        args.query.as_deref(),
    )
    .await?;

    let mut selected = Vec::new();
    for id in &args.ids {
        if storage.is_ignored(id)? {
            println!("{}", format!("Skipping ignored conversation {id}").yellow());
        } else if !selected.contains(id) {
            selected.push(id.clone());
        }
    }

    let targets = select_targets(kind, &loaded.items, &selected);
    if targets.is_empty() {
        println!("{}", "Nothing to delete.".yellow());
        return Ok(None);
    }

    let count = confirmation_count(
        kind,
        &loaded.items,
        &selected,
        loaded.total,
        loaded.ignored_total,
    );
    println!(
        "About to delete {} conversation(s) ({}).",
        count.to_string().bold(),
        kind
    );
    if count != targets.len() {
        println!(
            "{}",
            format!(
                "Only the {} loaded conversation(s) will be deleted in this run.",
                targets.len()
            )
            .dimmed()
        );
    }

    if !args.yes && !prompt_confirmation()? {
        println!("{}", "Cancelled.".yellow());
        return Ok(None);
    }

    let batch = BatchDeleter::new(bridge, Duration::from_millis(delete_delay));
    let cancellation = CancellationToken::new();

    let interrupt = {
        let token = cancellation.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                res = tokio::signal::ctrl_c() => {
                    if res.is_ok() {
                        eprintln!("{}", "Stopping after the current conversation...".yellow());
                        token.cancel();
                    }
                }
            }
        })
    };
    let printer = spawn_progress_printer(&batch);

    let items = loaded.items;
    let outcome = batch
        .run(&targets, |id| title_for(&items, id), kind, cancellation.clone())
        .await;

    interrupt.abort();
    drop(batch);
    if let Err(e) = printer.await {
        tracing::debug!("Progress printer ended abnormally: {e}");
    }

    Ok(Some(outcome?))
}

fn prompt_confirmation() -> Result<bool> {
    let mut rl = DefaultEditor::new()?;
    let prompt = format!("Type {} to confirm: ", CONFIRMATION_WORD);
    match rl.readline(&prompt) {
        Ok(line) => Ok(is_confirmed(&line)),
        Err(rustyline::error::ReadlineError::Interrupted)
        | Err(rustyline::error::ReadlineError::Eof) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Print one line per processed conversation until the batch publishes its
/// final snapshot.
fn spawn_progress_printer(batch: &BatchDeleter) -> tokio::task::JoinHandle<()> {
    let mut rx = batch.subscribe();
    tokio::spawn(async move {
        let mut printed = 0;
        while rx.changed().await.is_ok() {
            let progress: DeleteProgress = rx.borrow_and_update().clone();
            if progress.current > printed {
                printed = progress.current;
                println!(
                    "[{}/{}] {:>3}% {} ({} ok, {} failed)",
                    progress.current,
                    progress.total,
                    progress.percent(),
                    truncate_text(&progress.current_title, 48),
                    progress.success.to_string().green(),
                    progress.failed.to_string().red()
                );
            }
            if !progress.is_running && progress.total > 0 {
                break;
            }
        }
    })
}

fn print_summary(entry: &OperationLogEntry) {
    println!();
    if entry.is_complete() {
        println!("{}", "Batch complete.".green().bold());
    } else {
        println!(
            "{}",
            format!(
                "Batch cancelled: {} of {} not attempted.",
                entry.total - entry.success - entry.failed,
                entry.total
            )
            .yellow()
            .bold()
        );
    }
    println!(
        "Deleted {}, failed {}, total {}",
        entry.success.to_string().green(),
        entry.failed.to_string().red(),
        entry.total
    );

    if entry.failures.is_empty() {
        return;
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.add_row(row!["ID".bold(), "Title".bold(), "Reason".bold()]);
    for failure in &entry.failures {
        table.add_row(row![
            failure.id.cyan(),
            truncate_text(&failure.title, 40),
            failure.reason.red()
        ]);
    }
    table.printstd();
}
