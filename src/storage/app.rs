use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::types::{AppSettings, CacheData, OperationLogEntry, SettingsPatch};
use super::{KeyValueStore, CACHE_KEY, IGNORE_LIST_KEY, LOGS_KEY, SETTINGS_KEY};
use crate::error::Result;

/// Typed access to the persisted records.
///
/// Reads fall back to defaults when a record is missing or unreadable.
#[derive(Debug, Clone)]
pub struct AppStorage {
    store: Arc<dyn KeyValueStore>,
}

impl AppStorage {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Write defaults for settings, ignore list and logs when absent.
    pub fn initialize(&self) -> Result<()> {
        if self.store.get(SETTINGS_KEY)?.is_none() {
            self.write(SETTINGS_KEY, &AppSettings::default())?;
        }
        if self.store.get(IGNORE_LIST_KEY)?.is_none() {
            self.write(IGNORE_LIST_KEY, &Vec::<String>::new())?;
        }
        if self.store.get(LOGS_KEY)?.is_none() {
            self.write(LOGS_KEY, &Vec::<OperationLogEntry>::new())?;
        }
        Ok(())
    }

    fn read<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T> {
        let Some(value) = self.store.get(key)? else {
            return Ok(T::default());
        };
        match serde_json::from_value(value) {
            Ok(parsed) => Ok(parsed),
            Err(e) => {
                tracing::warn!(key, "Stored record unreadable, using defaults: {e}");
                Ok(T::default())
            }
        }
    }

    fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        self.store.set(key, &serde_json::to_value(value)?)
    }

    // Settings

    /// Stored settings merged over the defaults.
    pub fn settings(&self) -> Result<AppSettings> {
        self.read(SETTINGS_KEY)
    }

    pub fn update_settings(&self, patch: SettingsPatch) -> Result<AppSettings> {
        let mut settings = self.settings()?;
        patch.apply(&mut settings);
        self.write(SETTINGS_KEY, &settings)?;
        Ok(settings)
    }

    // Ignore list

    pub fn ignore_list(&self) -> Result<Vec<String>> {
        self.read(IGNORE_LIST_KEY)
    }

    /// Add `id`; returns false if it was already present.
    pub fn add_to_ignore_list(&self, id: &str) -> Result<bool> {
        let mut list = self.ignore_list()?;
        if list.iter().any(|existing| existing == id) {
            return Ok(false);
        }
        list.push(id.to_string());
        self.write(IGNORE_LIST_KEY, &list)?;
        Ok(true)
    }

    /// Remove `id`; returns false if it was not present.
    pub fn remove_from_ignore_list(&self, id: &str) -> Result<bool> {
        let mut list = self.ignore_list()?;
        let before = list.len();
        list.retain(|existing| existing != id);
        if list.len() == before {
            return Ok(false);
        }
        self.write(IGNORE_LIST_KEY, &list)?;
        Ok(true)
    }

    pub fn is_ignored(&self, id: &str) -> Result<bool> {
        Ok(self.ignore_list()?.iter().any(|existing| existing == id))
    }

    pub fn clear_ignore_list(&self) -> Result<()> {
        self.write(IGNORE_LIST_KEY, &Vec::<String>::new())
    }

    // Operation log

    /// Entries, newest first.
    pub fn logs(&self) -> Result<Vec<OperationLogEntry>> {
        self.read(LOGS_KEY)
    }

    /// Prepend `entry`, evicting the oldest entries beyond `maxLogs`.
    pub fn add_log(&self, entry: OperationLogEntry) -> Result<()> {
        let max_logs = self.settings()?.max_logs;
        let mut logs = self.logs()?;
        logs.insert(0, entry);
        logs.truncate(max_logs);
        self.write(LOGS_KEY, &logs)
    }

    pub fn clear_logs(&self) -> Result<()> {
        self.write(LOGS_KEY, &Vec::<OperationLogEntry>::new())
    }

    // Cache

    pub fn cache(&self) -> Result<CacheData> {
        self.read(CACHE_KEY)
    }

    /// Overlay the fields set in `update` onto the stored cache record.
    pub fn set_cache(&self, update: CacheData) -> Result<()> {
        let mut cache = self.cache()?;
        cache.merge(update);
        self.write(CACHE_KEY, &cache)
    }

    /// Remove every record, then write the defaults back.
    pub fn clear_all(&self) -> Result<()> {
        self.store.clear()?;
        self.initialize()
    }
}
