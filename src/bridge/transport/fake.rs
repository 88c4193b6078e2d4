//! In-process fake transport for bridge unit tests
//!
//! [`FakeTransport`] records every delivered request so a test can read it
//! through [`FakeTransportHandle::outbound_rx`] and answer (or not answer)
//! by writing to the inbound channel it passed to
//! [`crate::bridge::start_response_loop`]. Tests can also simulate a missing
//! target context or a broken delivery channel.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;

use crate::bridge::transport::{ContextId, Transport};
use crate::error::{Result, SweepError};

/// Fake [`Transport`] with a single, optionally absent, target context.
#[derive(Debug)]
pub struct FakeTransport {
    outbound_tx: mpsc::UnboundedSender<String>,
    has_target: AtomicBool,
    fail_delivery: AtomicBool,
}

/// The test-side handle for a [`FakeTransport`].
#[derive(Debug)]
pub struct FakeTransportHandle {
    /// Receives every message handed to [`Transport::deliver`]
    pub outbound_rx: mpsc::UnboundedReceiver<String>,
}

impl FakeTransport {
    /// Id reported for the single fake context.
    pub const TARGET: ContextId = ContextId(1);

    /// Create a `(FakeTransport, FakeTransportHandle)` pair with a target
    /// context present.
    pub fn new() -> (Self, FakeTransportHandle) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<String>();
        let transport = Self {
            outbound_tx,
            has_target: AtomicBool::new(true),
            fail_delivery: AtomicBool::new(false),
        };
        (transport, FakeTransportHandle { outbound_rx })
    }

    /// Make [`Transport::locate`] report no context.
    pub fn without_target(self) -> Self {
        self.has_target.store(false, Ordering::SeqCst);
        self
    }

    /// Make [`Transport::deliver`] fail.
    pub fn with_failing_delivery(self) -> Self {
        self.fail_delivery.store(true, Ordering::SeqCst);
        self
    }
}

#[async_trait::async_trait]
impl Transport for FakeTransport {
    async fn locate(&self, _origin: &str) -> Result<Option<ContextId>> {
        Ok(self
            .has_target
            .load(Ordering::SeqCst)
            .then_some(Self::TARGET))
    }

    async fn deliver(&self, _target: ContextId, message: String) -> Result<()> {
        if self.fail_delivery.load(Ordering::SeqCst) {
            return Err(SweepError::Delivery("fake channel refused message".to_string()).into());
        }
        self.outbound_tx.send(message).map_err(|e| {
            SweepError::Delivery(format!("FakeTransport outbound channel closed: {e}")).into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deliver_records_message() {
        let (transport, mut handle) = FakeTransport::new();
        transport
            .deliver(FakeTransport::TARGET, "{}".to_string())
            .await
            .unwrap();
        assert_eq!(handle.outbound_rx.recv().await.unwrap(), "{}");
    }

    #[tokio::test]
    async fn test_without_target_locates_nothing() {
        let (transport, _handle) = FakeTransport::new();
        let transport = transport.without_target();
        assert_eq!(transport.locate("anything").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_failing_delivery_errors() {
        let (transport, _handle) = FakeTransport::new();
        let transport = transport.with_failing_delivery();
        assert!(transport
            .deliver(FakeTransport::TARGET, "{}".to_string())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_deliver_errors_when_handle_dropped() {
        let (transport, handle) = FakeTransport::new();
        drop(handle);
        assert!(transport
            .deliver(FakeTransport::TARGET, "{}".to_string())
            .await
            .is_err());
    }

    #[test]
    fn test_fake_transport_is_object_safe() {
        let (transport, _handle) = FakeTransport::new();
        let _boxed: Box<dyn Transport> = Box::new(transport);
    }
}
