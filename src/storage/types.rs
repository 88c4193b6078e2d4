use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::conversation::BatchKind;

/// User-adjustable settings persisted under the settings key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    /// Hide ignored conversations from listings
    pub hide_ignored: bool,
    /// UI language code
    pub language: String,
    /// Base delay between deletes in milliseconds
    pub delete_delay: u64,
    /// Maximum number of operation log entries kept
    pub max_logs: usize,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            hide_ignored: false,
            language: "en".to_string(),
            delete_delay: 1000,
            max_logs: 50,
        }
    }
}

/// Partial update applied by [`super::AppStorage::update_settings`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hide_ignored: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_delay: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_logs: Option<usize>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub(crate) fn apply(self, settings: &mut AppSettings) {
        if let Some(v) = self.hide_ignored {
            settings.hide_ignored = v;
        }
        if let Some(v) = self.language {
            settings.language = v;
        }
        if let Some(v) = self.delete_delay {
            settings.delete_delay = v;
        }
        if let Some(v) = self.max_logs {
            settings.max_logs = v;
        }
    }
}

/// One conversation a batch failed to delete
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub id: String,
    pub title: String,
    pub reason: String,
}

/// Summary of one batch delete run
///
/// For a run that completed, `success + failed == total`. A cancelled run
/// leaves the remainder unattempted and unrecorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationLogEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: BatchKind,
    pub timestamp: DateTime<Utc>,
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    #[serde(default)]
    pub failures: Vec<FailureRecord>,
}

impl OperationLogEntry {
    /// Whether every target was attempted.
    pub fn is_complete(&self) -> bool {
        self.success + self.failed == self.total
    }
}

/// Cached session data and the last successful listing time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_expiry: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<DateTime<Utc>>,
}

impl CacheData {
    /// Overlay the fields set in `other`.
    pub fn merge(&mut self, other: CacheData) {
        if other.token.is_some() {
            self.token = other.token;
        }
        if other.token_expiry.is_some() {
            self.token_expiry = other.token_expiry;
        }
        if other.last_sync.is_some() {
            self.last_sync = other.last_sync;
        }
    }
}
