use colored::Colorize;
use prettytable::{format, row, Table};
use serde::Serialize;

use super::{load_page, open_storage, Session};
use crate::config::Config;
use crate::conversation::{
    calculate_pagination, format_relative_time, truncate_text, visible_items, ConversationItem,
    PaginationInfo,
};
use crate::error::Result;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ListOutput<'a> {
    items: Vec<&'a ConversationItem>,
    total: u32,
    pagination: PaginationInfo,
}

/// List one page of conversations.
pub async fn run_list(
    config: &Config,
    offset: u32,
    limit: u32,
    query: Option<String>,
    json: bool,
) -> Result<()> {
    let storage = open_storage(config)?;
    let settings = storage.settings()?;

    let session = Session::start(config).await?;
    let loaded = match session.ensure_connected().await {
        Ok(_) => load_page(&session.bridge(), &storage, offset, limit, query.as_deref()).await,
        Err(e) => Err(e),
    };
    session.shutdown().await;
    let loaded = loaded?;

    let pagination = calculate_pagination(loaded.total, offset, limit);
    let shown = visible_items(&loaded.items, settings.hide_ignored);

    if json {
        let output = ListOutput {
            items: shown,
            total: loaded.total,
            pagination,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if shown.is_empty() {
        println!("{}", "No conversations found.".yellow());
        return Ok(());
    }

    let now = chrono::Utc::now();
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.add_row(row![
        "#".bold(),
        "ID".bold(),
        "Title".bold(),
        "Updated".bold(),
        "".bold()
    ]);

    for (index, item) in shown.iter().enumerate() {
        let updated = item
            .update_time
            .or(item.create_time)
            .map(|t| format_relative_time(t, now))
            .unwrap_or_else(|| "-".to_string());
        let marker = if item.is_ignored {
            "ignored".dimmed()
        } else {
            "".normal()
        };
        table.add_row(row![
            offset as usize + index + 1,
            item.id.cyan(),
            truncate_text(&item.title, 48),
            updated,
            marker
        ]);
    }

    table.printstd();
    println!(
        "Page {} of {} (items {}-{} of {})",
        pagination.current_page,
        pagination.total_pages,
        pagination.start_index,
        pagination.end_index,
        loaded.total
    );
    if settings.hide_ignored && shown.len() < loaded.items.len() {
        println!(
            "{}",
            format!("{} ignored conversation(s) hidden", loaded.items.len() - shown.len()).dimmed()
        );
    }
    if pagination.has_next {
        println!(
            "Next page: {}",
            format!("chatsweep list --offset {}", offset.saturating_add(limit)).cyan()
        );
    }

    Ok(())
}
