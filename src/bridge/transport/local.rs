//! In-process transport connecting the bridge to attached host contexts
//!
//! Each call to [`LocalTransport::attach`] registers one privileged context
//! under an origin and returns the [`HostEndpoint`] that a
//! [`crate::remote::ContentHost`] serves. Contexts never share memory with
//! the bridge: requests and responses cross as serialized JSON strings.
//!
//! ```text
//! bridge deliver() --> requests_tx --> endpoint.requests  (host reads)
//! host responds    --> endpoint.responses --> responses_rx (response loop)
//! ```
//!
//! A context whose endpoint has been dropped is skipped by
//! [`Transport::locate`] and fails [`Transport::deliver`].

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{mpsc, Mutex};

use crate::bridge::transport::{origin_matches, ContextId, Transport};
use crate::error::{Result, SweepError};

/// One attached context as seen from the bridge side.
#[derive(Debug)]
struct AttachedContext {
    id: ContextId,
    origin: String,
    requests_tx: mpsc::UnboundedSender<String>,
}

/// The context-side ends of an attachment.
#[derive(Debug)]
pub struct HostEndpoint {
    /// Id under which the context was registered
    pub id: ContextId,
    /// Origin the context was attached for
    pub origin: String,
    /// Serialized requests delivered to this context
    pub requests: mpsc::UnboundedReceiver<String>,
    /// Where this context writes serialized responses
    pub responses: mpsc::UnboundedSender<String>,
}

/// In-process [`Transport`] over unbounded channels.
#[derive(Debug)]
pub struct LocalTransport {
    next_id: AtomicU64,
    contexts: Mutex<Vec<AttachedContext>>,
    responses_tx: mpsc::UnboundedSender<String>,
}

impl LocalTransport {
    /// Create a transport and the receiver on which all attached contexts'
    /// responses arrive.
    ///
    /// Pass the receiver to [`crate::bridge::start_response_loop`].
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (responses_tx, responses_rx) = mpsc::unbounded_channel::<String>();
        let transport = Self {
            next_id: AtomicU64::new(1),
            contexts: Mutex::new(Vec::new()),
            responses_tx,
        };
        (transport, responses_rx)
    }

    /// Register a new privileged context for `origin`.
    pub async fn attach(&self, origin: impl Into<String>) -> HostEndpoint {
        let origin = origin.into();
        let id = ContextId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (requests_tx, requests) = mpsc::unbounded_channel::<String>();

        self.contexts.lock().await.push(AttachedContext {
            id,
            origin: origin.clone(),
            requests_tx,
        });
        tracing::debug!(context = %id, origin = %origin, "Attached privileged context");

        HostEndpoint {
            id,
            origin,
            requests,
            responses: self.responses_tx.clone(),
        }
    }

    /// Remove a context; subsequent deliveries to it fail.
    pub async fn detach(&self, id: ContextId) {
        self.contexts.lock().await.retain(|c| c.id != id);
        tracing::debug!(context = %id, "Detached privileged context");
    }

    /// Number of attached contexts whose endpoint is still alive.
    pub async fn live_contexts(&self) -> usize {
        self.contexts
            .lock()
            .await
            .iter()
            .filter(|c| !c.requests_tx.is_closed())
            .count()
    }
}

#[async_trait::async_trait]
impl Transport for LocalTransport {
    async fn locate(&self, origin: &str) -> Result<Option<ContextId>> {
        let contexts = self.contexts.lock().await;
        Ok(contexts
            .iter()
            .find(|c| !c.requests_tx.is_closed() && origin_matches(origin, &c.origin))
            .map(|c| c.id))
    }

    async fn deliver(&self, target: ContextId, message: String) -> Result<()> {
        let contexts = self.contexts.lock().await;
        let context = contexts
            .iter()
            .find(|c| c.id == target)
            .ok_or_else(|| SweepError::Delivery(format!("context {target} is not attached")))?;

        context.requests_tx.send(message).map_err(|_| {
            SweepError::Delivery(format!("context {target} closed its request channel")).into()
        })
    }
}
