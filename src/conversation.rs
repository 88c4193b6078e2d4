//! Conversation list helpers for the UI context
//!
//! Merges a remote listing with the ignore list, computes pagination, and
//! picks the ids a batch operation targets.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::protocol::RemoteConversation;

/// Page size used when listing conversations.
pub const CONVERSATION_LIMIT: u32 = 28;

/// Title shown for conversations the remote reports without one.
pub const UNTITLED: &str = "Untitled";

/// Title used when an id is not in the loaded list.
pub const UNKNOWN_TITLE: &str = "Unknown conversation";

/// A conversation as displayed, tagged with its ignore state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationItem {
    pub id: String,
    pub title: String,
    pub create_time: Option<DateTime<Utc>>,
    pub update_time: Option<DateTime<Utc>>,
    /// Membership in the ignore list at merge time
    pub is_ignored: bool,
}

/// Which selection a batch delete was started from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchKind {
    /// Ids the user picked explicitly
    Selected,
    /// Every non-ignored item on the loaded page
    Page,
    /// Every non-ignored loaded item
    All,
}

impl std::fmt::Display for BatchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Selected => "selected",
            Self::Page => "page",
            Self::All => "all",
        })
    }
}

/// Tag each remote item with its ignore state.
///
/// Pure: the same inputs always produce the same output.
pub fn merge(remote: &[RemoteConversation], ignore_ids: &[String]) -> Vec<ConversationItem> {
    let ignored: HashSet<&str> = ignore_ids.iter().map(String::as_str).collect();

    remote
        .iter()
        .map(|conv| ConversationItem {
            id: conv.id.clone(),
            title: conv
                .title
                .as_deref()
                .filter(|t| !t.is_empty())
                .unwrap_or(UNTITLED)
                .to_string(),
            create_time: conv.create_time.as_ref().and_then(|t| t.to_datetime()),
            update_time: conv.update_time.as_ref().and_then(|t| t.to_datetime()),
            is_ignored: ignored.contains(conv.id.as_str()),
        })
        .collect()
}

/// Items to display, optionally hiding ignored ones.
pub fn visible_items(items: &[ConversationItem], hide_ignored: bool) -> Vec<&ConversationItem> {
    items
        .iter()
        .filter(|item| !(hide_ignored && item.is_ignored))
        .collect()
}

/// Ids a batch of `kind` deletes.
///
/// `Page` and `All` both cover only the loaded items; a delete across the
/// whole remote history would need to page through the service first.
pub fn select_targets(
    kind: BatchKind,
    items: &[ConversationItem],
    selected: &[String],
) -> Vec<String> {
    match kind {
        BatchKind::Selected => selected.to_vec(),
        BatchKind::Page | BatchKind::All => items
            .iter()
            .filter(|item| !item.is_ignored)
            .map(|item| item.id.clone())
            .collect(),
    }
}

/// Count shown in the confirmation prompt for a batch of `kind`.
pub fn confirmation_count(
    kind: BatchKind,
    items: &[ConversationItem],
    selected: &[String],
    total: u32,
    ignored_total: usize,
) -> usize {
    match kind {
        BatchKind::Selected => selected.len(),
        BatchKind::Page => items.iter().filter(|item| !item.is_ignored).count(),
        BatchKind::All => (total as usize).saturating_sub(ignored_total),
    }
}

/// Title of `id` in `items`, or [`UNKNOWN_TITLE`].
pub fn title_for(items: &[ConversationItem], id: &str) -> String {
    items
        .iter()
        .find(|item| item.id == id)
        .map(|item| item.title.clone())
        .unwrap_or_else(|| UNKNOWN_TITLE.to_string())
}

/// Position of a page within a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationInfo {
    pub current_page: u32,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
    /// 1-based index of the first item on the page
    pub start_index: u32,
    /// 1-based index of the last item on the page
    pub end_index: u32,
}

/// Compute pagination for `total` items viewed at `offset` with `limit`.
///
/// A zero `limit` is treated as one to avoid dividing by zero.
pub fn calculate_pagination(total: u32, offset: u32, limit: u32) -> PaginationInfo {
    let limit = limit.max(1);
    let current_page = offset / limit + 1;
    let total_pages = total.div_ceil(limit);

    PaginationInfo {
        current_page,
        total_pages,
        has_next: current_page < total_pages,
        has_prev: current_page > 1,
        start_index: offset.saturating_add(1),
        end_index: offset.saturating_add(limit).min(total),
    }
}

/// Human-friendly age of a timestamp, e.g. `"3 days ago"`.
pub fn format_relative_time(time: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - time).num_seconds();
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;

    let plural = |n: i64, unit: &str| {
        format!("{n} {unit}{} ago", if n > 1 { "s" } else { "" })
    };

    if days > 0 {
        plural(days, "day")
    } else if hours > 0 {
        plural(hours, "hour")
    } else if minutes > 0 {
        plural(minutes, "minute")
    } else {
        "Just now".to_string()
    }
}

/// Shorten `text` to at most `max_len` characters, ending in `...`.
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_len.saturating_sub(3)).collect();
    format!("{kept}...")
}
