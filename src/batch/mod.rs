//! Sequential batch deletion
//!
//! [`BatchDeleter`] walks a list of conversation ids one at a time, pacing
//! deletes with a jittered delay, publishing [`DeleteProgress`] snapshots
//! and stopping cooperatively when cancelled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::bridge::MessageBridge;
use crate::error::Result;

pub mod deleter;

pub use deleter::{jittered_delay, BatchDeleter};

/// Something that can soft-delete one conversation.
#[async_trait]
pub trait ConversationDeleter: Send + Sync {
    /// Delete `id`; `Ok(false)` means the remote declined without an error.
    async fn delete(&self, id: &str) -> Result<bool>;
}

#[async_trait]
impl ConversationDeleter for MessageBridge {
    async fn delete(&self, id: &str) -> Result<bool> {
        self.delete_conversation(id).await
    }
}

/// Live view of a running batch
///
/// Every published snapshot satisfies `success + failed == current <= total`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteProgress {
    pub total: usize,
    pub current: usize,
    pub success: usize,
    pub failed: usize,
    pub current_title: String,
    pub is_running: bool,
    pub can_cancel: bool,
}

impl DeleteProgress {
    /// Percentage of items processed, 0 for an empty batch.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        ((self.current * 100) / self.total) as u8
    }
}

/// Lifecycle of a [`BatchDeleter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Idle,
    Running,
    Completed,
    Cancelled,
}
