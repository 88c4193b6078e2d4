//! Cross-context messaging bridge
//!
//! The UI context cannot reach the remote service's authenticated session,
//! so every read and delete is proxied to a privileged context through this
//! bridge.
//!
//! # Module Layout
//!
//! - `client`    -- [`MessageBridge`], the pending-request table and the
//!   response loop
//! - `transport` -- [`transport::Transport`] trait and its implementations

pub mod client;
pub mod transport;

pub use client::{
    start_response_loop, BridgeOptions, MessageBridge, DEFAULT_REQUEST_TIMEOUT,
    DEFAULT_STATUS_TIMEOUT,
};
pub use transport::local::{HostEndpoint, LocalTransport};
pub use transport::{ContextId, Transport};
