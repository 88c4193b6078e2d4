//! Local key/value persistence
//!
//! Four records live in the store: the ignore list, the operation log, the
//! settings and a cache record. [`AppStorage`] gives them typed access over
//! any [`KeyValueStore`].

use crate::error::{Result, SweepError};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

pub mod app;
pub mod types;

pub use app::AppStorage;
pub use types::{AppSettings, CacheData, FailureRecord, OperationLogEntry, SettingsPatch};

pub const IGNORE_LIST_KEY: &str = "chatsweep_ignoreList";
pub const LOGS_KEY: &str = "chatsweep_logs";
pub const SETTINGS_KEY: &str = "chatsweep_settings";
pub const CACHE_KEY: &str = "chatsweep_cache";

/// A string-keyed store of JSON values
pub trait KeyValueStore: Send + Sync + std::fmt::Debug {
    fn get(&self, key: &str) -> Result<Option<Value>>;
    fn set(&self, key: &str, value: &Value) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// Store backed by an embedded sled database
#[derive(Debug)]
pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    /// Open (or create) the database in directory `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                SweepError::Storage(format!("Failed to create data directory: {}", e))
            })?;
        }
        let db = sled::open(path)
            .map_err(|e| SweepError::Storage(format!("Failed to open database: {}", e)))?;
        tracing::debug!(path = %path.display(), "Opened store");
        Ok(Self { db })
    }

    fn flush(&self) -> Result<()> {
        self.db
            .flush()
            .map_err(|e| SweepError::Storage(format!("Flush failed: {}", e)))?;
        Ok(())
    }
}

impl KeyValueStore for SledStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        match self
            .db
            .get(key.as_bytes())
            .map_err(|e| SweepError::Storage(format!("Get failed: {}", e)))?
        {
            Some(bytes) => {
                let value = serde_json::from_slice(&bytes).map_err(|e| {
                    SweepError::Storage(format!("Deserialization failed for {}: {}", key, e))
                })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &Value) -> Result<()> {
        let bytes = serde_json::to_vec(value)
            .map_err(|e| SweepError::Storage(format!("Serialization failed: {}", e)))?;
        self.db
            .insert(key.as_bytes(), bytes)
            .map_err(|e| SweepError::Storage(format!("Insert failed: {}", e)))?;
        self.flush()
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.db
            .remove(key.as_bytes())
            .map_err(|e| SweepError::Storage(format!("Remove failed: {}", e)))?;
        self.flush()
    }

    fn clear(&self) -> Result<()> {
        self.db
            .clear()
            .map_err(|e| SweepError::Storage(format!("Clear failed: {}", e)))?;
        self.flush()
    }
}

/// In-memory store; contents vanish with the value
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, Value>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &Value) -> Result<()> {
        self.entries().insert(key.to_string(), value.clone());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries().remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.entries().clear();
        Ok(())
    }
}
