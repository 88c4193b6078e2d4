//! Chatsweep - batch conversation cleanup library
//!
//! A UI context that cannot reach the remote service's authenticated session
//! proxies every listing and delete through a privileged context. This crate
//! provides that request/response bridge, the session client behind it, and
//! the paced batch-delete workflow on top.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `protocol`: Wire envelopes and payloads exchanged between contexts
//! - `bridge`: [`bridge::MessageBridge`], transports and the response loop
//! - `remote`: Token-caching session client and the request-serving host
//! - `batch`: Sequential batch deleter with progress and cancellation
//! - `conversation`: List merge, pagination and target selection
//! - `storage`: Settings, ignore list, operation log and cache records
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use chatsweep::bridge::{start_response_loop, BridgeOptions, LocalTransport, MessageBridge};
//! use chatsweep::config::RemoteConfig;
//! use chatsweep::remote::{ContentHost, RemoteSessionClient, SystemClock};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> chatsweep::Result<()> {
//! let cancel = CancellationToken::new();
//! let (transport, inbound) = LocalTransport::new();
//! let transport = Arc::new(transport);
//!
//! let client = RemoteSessionClient::new(&RemoteConfig::default(), Arc::new(SystemClock))?;
//! let endpoint = transport.attach("https://chatgpt.com").await;
//! Arc::new(ContentHost::new(Arc::new(client))).spawn(endpoint, cancel.clone());
//!
//! let bridge = Arc::new(MessageBridge::new(
//!     transport,
//!     BridgeOptions::new("https://chatgpt.com"),
//! ));
//! start_response_loop(inbound, cancel.clone(), bridge.clone());
//!
//! let page = bridge.list_conversations(0, 28).await?;
//! println!("{} conversations", page.items.len());
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod bridge;
pub mod cli;
pub mod commands;
pub mod config;
pub mod conversation;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod remote;
pub mod storage;

pub use batch::{BatchDeleter, DeleteProgress};
pub use bridge::MessageBridge;
pub use config::Config;
pub use error::{Result, SweepError};
