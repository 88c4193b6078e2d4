//! Configuration management for Chatsweep
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::bridge::BridgeOptions;
use crate::error::{Result, SweepError};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure for Chatsweep
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote service and session settings
    #[serde(default)]
    pub remote: RemoteConfig,
    /// Cross-context bridge settings
    #[serde(default)]
    pub bridge: BridgeConfig,
    /// Local key/value storage settings
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Remote service configuration
///
/// Used by the privileged context to reach the session and conversation
/// endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the conversation service
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Raw `Cookie` header value carrying the browser session
    ///
    /// Sent verbatim with every remote request when set.
    #[serde(default)]
    pub session_cookie: Option<String>,

    /// Lifetime of a cached access token in seconds
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,

    /// Timeout for individual HTTP requests in seconds
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://chatgpt.com".to_string()
}

fn default_token_ttl_secs() -> u64 {
    55 * 60
}

fn default_http_timeout_secs() -> u64 {
    30
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            session_cookie: None,
            token_ttl_secs: default_token_ttl_secs(),
            http_timeout_secs: default_http_timeout_secs(),
        }
    }
}

/// Bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Origin the privileged context must host
    #[serde(default = "default_target_origin")]
    pub target_origin: String,

    /// Per-request deadline in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Deadline for status checks in milliseconds
    #[serde(default = "default_status_timeout_ms")]
    pub status_timeout_ms: u64,
}

fn default_target_origin() -> String {
    "https://chatgpt.com".to_string()
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_status_timeout_ms() -> u64 {
    5_000
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            target_origin: default_target_origin(),
            request_timeout_ms: default_request_timeout_ms(),
            status_timeout_ms: default_status_timeout_ms(),
        }
    }
}

impl BridgeConfig {
    /// Convert to the options consumed by [`crate::bridge::MessageBridge`].
    pub fn to_options(&self) -> BridgeOptions {
        BridgeOptions {
            target_origin: self.target_origin.clone(),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            status_timeout: Duration::from_millis(self.status_timeout_ms),
        }
    }
}

/// Local storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory of the sled database; defaults to the platform data dir
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl StorageConfig {
    /// Directory the store lives in.
    ///
    /// # Errors
    ///
    /// Returns [`SweepError::Storage`] when no path is configured and the
    /// platform data directory cannot be determined.
    pub fn resolved_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.path {
            return Ok(path.clone());
        }
        let proj_dirs = ProjectDirs::from("com", "chatsweep", "chatsweep")
            .ok_or_else(|| SweepError::Storage("Could not determine data directory".into()))?;
        Ok(proj_dirs.data_dir().join("store"))
    }
}

impl Config {
    /// Load configuration from `path`, then apply environment and CLI
    /// overrides.
    ///
    /// A missing file is not an error; defaults are used instead.
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| SweepError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| SweepError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(base_url) = std::env::var("CHATSWEEP_BASE_URL") {
            self.remote.base_url = base_url;
        }

        if let Ok(cookie) = std::env::var("CHATSWEEP_SESSION_COOKIE") {
            self.remote.session_cookie = Some(cookie).filter(|c| !c.is_empty());
        }

        if let Ok(timeout) = std::env::var("CHATSWEEP_REQUEST_TIMEOUT_MS") {
            if let Ok(value) = timeout.parse() {
                self.bridge.request_timeout_ms = value;
            } else {
                tracing::warn!("Invalid CHATSWEEP_REQUEST_TIMEOUT_MS: {}", timeout);
            }
        }

        if let Ok(timeout) = std::env::var("CHATSWEEP_STATUS_TIMEOUT_MS") {
            if let Ok(value) = timeout.parse() {
                self.bridge.status_timeout_ms = value;
            } else {
                tracing::warn!("Invalid CHATSWEEP_STATUS_TIMEOUT_MS: {}", timeout);
            }
        }

        if let Ok(path) = std::env::var("CHATSWEEP_STORAGE_PATH") {
            if !path.is_empty() {
                self.storage.path = Some(PathBuf::from(path));
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(path) = &cli.storage_path {
            self.storage.path = Some(path.clone());
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns [`SweepError::Config`] describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if self.remote.base_url.trim().is_empty() {
            return Err(SweepError::Config("remote.base_url cannot be empty".to_string()).into());
        }

        if url::Url::parse(&self.remote.base_url).is_err() {
            return Err(SweepError::Config(format!(
                "Invalid remote.base_url: {}",
                self.remote.base_url
            ))
            .into());
        }

        if self.remote.token_ttl_secs == 0 {
            return Err(SweepError::Config(
                "remote.token_ttl_secs must be greater than 0".to_string(),
            )
            .into());
        }

        if self.remote.http_timeout_secs == 0 {
            return Err(SweepError::Config(
                "remote.http_timeout_secs must be greater than 0".to_string(),
            )
            .into());
        }

        if self.bridge.target_origin.trim().is_empty() {
            return Err(
                SweepError::Config("bridge.target_origin cannot be empty".to_string()).into(),
            );
        }

        if self.bridge.request_timeout_ms == 0 || self.bridge.status_timeout_ms == 0 {
            return Err(SweepError::Config(
                "bridge timeouts must be greater than 0".to_string(),
            )
            .into());
        }

        if self.bridge.status_timeout_ms > self.bridge.request_timeout_ms {
            return Err(SweepError::Config(format!(
                "bridge.status_timeout_ms ({}) must not exceed bridge.request_timeout_ms ({})",
                self.bridge.status_timeout_ms, self.bridge.request_timeout_ms
            ))
            .into());
        }

        Ok(())
    }
}
