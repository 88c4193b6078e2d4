//! Delivery channel between the UI context and privileged contexts
//!
//! The [`Transport`] trait covers the outbound half of the bridge: finding a
//! privileged context that hosts the target origin and handing it a
//! serialized request. Responses travel back on a separate inbound channel
//! consumed by [`crate::bridge::start_response_loop`], so a transport never
//! needs to know about request correlation.
//!
//! - [`local::LocalTransport`] -- in-process registry of attached contexts,
//!   each served by a [`crate::remote::ContentHost`] task.
//! - [`fake::FakeTransport`] -- records outbound traffic in tests
//!   (cfg(test) only).

use crate::error::Result;

/// Opaque handle to one attached privileged context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(pub u64);

impl std::fmt::Display for ContextId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ctx-{}", self.0)
    }
}

/// Abstraction over the channel used to reach a privileged context.
#[async_trait::async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Find a privileged context hosting `origin`.
    ///
    /// Returns `Ok(None)` when no such context is attached.
    async fn locate(&self, origin: &str) -> Result<Option<ContextId>>;

    /// Hand a serialized request to the given context.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::SweepError::Delivery`] if the context is gone
    /// or the channel to it is closed.
    async fn deliver(&self, target: ContextId, message: String) -> Result<()>;
}

/// Returns `true` when `origin` belongs to the site described by `pattern`.
///
/// Both sides are compared by scheme-less host name, so
/// `https://chatgpt.com` matches a context attached as
/// `https://chatgpt.com/c/123`.
pub fn origin_matches(pattern: &str, origin: &str) -> bool {
    match (url::Url::parse(pattern), url::Url::parse(origin)) {
        (Ok(p), Ok(o)) => p.host_str().is_some() && p.host_str() == o.host_str(),
        _ => pattern.trim_end_matches('/') == origin.trim_end_matches('/'),
    }
}

pub mod local;

#[cfg(test)]
pub mod fake;
