//! Request/response bridge from the UI context to a privileged context
//!
//! [`MessageBridge`] tags each outgoing [`Request`] with a unique id, parks a
//! [`oneshot`] sender for it in a pending-request table, delivers the request
//! through a [`Transport`], and waits for the matching [`Response`].
//!
//! # Design
//!
//! - The pending slot is registered before the request leaves, so a fast
//!   response can never race ahead of its slot.
//! - [`start_response_loop`] consumes inbound serialized responses and
//!   settles the matching slot. Settling removes the slot, so a duplicate
//!   response for the same id finds nothing and is dropped.
//! - A request whose deadline elapses removes its own slot before failing
//!   with [`SweepError::RequestTimeout`]; any response arriving later is
//!   dropped the same way.
//! - Cancelling the loop's [`CancellationToken`] clears the table so every
//!   waiting caller fails with [`SweepError::Delivery`] instead of hanging.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_util::sync::CancellationToken;

use crate::bridge::transport::Transport;
use crate::error::{Result, SweepError};
use crate::protocol::{
    ConversationPage, DeletePayload, DeleteResult, ListPayload, MessageType, Request, Response,
    SearchPayload, SessionStatus, TokenData,
};

/// Default deadline for a request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default deadline for the liveness probe.
pub const DEFAULT_STATUS_TIMEOUT: Duration = Duration::from_secs(5);

/// Pending-request table: request id to the sender that settles it.
type PendingMap = HashMap<String, oneshot::Sender<Response>>;

/// Bridge settings.
#[derive(Debug, Clone)]
pub struct BridgeOptions {
    /// Origin a privileged context must host to receive requests
    pub target_origin: String,
    /// Deadline applied to every request except status checks
    pub request_timeout: Duration,
    /// Deadline applied to status checks
    pub status_timeout: Duration,
}

impl BridgeOptions {
    /// Options for `target_origin` with default deadlines.
    pub fn new(target_origin: impl Into<String>) -> Self {
        Self {
            target_origin: target_origin.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            status_timeout: DEFAULT_STATUS_TIMEOUT,
        }
    }
}

/// UI-side end of the cross-context request/response protocol.
pub struct MessageBridge {
    transport: Arc<dyn Transport>,
    pending: Mutex<PendingMap>,
    options: BridgeOptions,
}

impl std::fmt::Debug for MessageBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageBridge")
            .field("transport", &self.transport)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl MessageBridge {
    /// Create a bridge over `transport`.
    ///
    /// The caller must also run [`start_response_loop`] with the inbound
    /// side of the transport, otherwise every request times out.
    pub fn new(transport: Arc<dyn Transport>, options: BridgeOptions) -> Self {
        Self {
            transport,
            pending: Mutex::new(HashMap::new()),
            options,
        }
    }

    /// Bridge settings in effect.
    pub fn options(&self) -> &BridgeOptions {
        &self.options
    }

    /// Number of requests still waiting for a response.
    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// Send `request` and wait at most `timeout` for its response.
    ///
    /// Returns the response `data` (or `null`) on success.
    ///
    /// # Errors
    ///
    /// - [`SweepError::NoTargetContext`] when no context hosts the target origin
    /// - [`SweepError::Delivery`] when the channel to the context fails
    /// - [`SweepError::RequestTimeout`] when no response arrives in time
    /// - [`SweepError::RemoteOperation`] when the response reports failure
    pub async fn send(&self, request: Request, timeout: Duration) -> Result<serde_json::Value> {
        let message = serde_json::to_string(&request)?;
        let request_id = request.request_id.clone();

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(request_id.clone(), tx);

        tracing::debug!(
            request_id = %request_id,
            request_type = %request.message_type,
            "Sending request to privileged context"
        );

        let outcome = tokio::time::timeout(timeout, self.dispatch(message, rx)).await;

        let response = match outcome {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                self.forget(&request_id).await;
                return Err(e);
            }
            Err(_) => {
                self.forget(&request_id).await;
                tracing::warn!(
                    request_id = %request_id,
                    request_type = %request.message_type,
                    "Request timed out"
                );
                return Err(SweepError::RequestTimeout {
                    request_type: request.message_type.to_string(),
                    request_id,
                }
                .into());
            }
        };

        if response.success {
            Ok(response.data.unwrap_or(serde_json::Value::Null))
        } else {
            let message = response
                .error
                .unwrap_or_else(|| "Unknown error".to_string());
            Err(SweepError::remote(message).into())
        }
    }

    /// Locate the target context, deliver the message, and await the slot.
    async fn dispatch(&self, message: String, rx: oneshot::Receiver<Response>) -> Result<Response> {
        let origin = &self.options.target_origin;
        let target = self
            .transport
            .locate(origin)
            .await
            .map_err(|e| SweepError::Delivery(e.to_string()))?
            .ok_or_else(|| SweepError::NoTargetContext(origin.clone()))?;

        self.transport.deliver(target, message).await?;

        rx.await.map_err(|_| {
            SweepError::Delivery("response loop stopped before a response arrived".to_string())
                .into()
        })
    }

    /// Drop the pending slot for `request_id`, if still present.
    async fn forget(&self, request_id: &str) {
        self.pending.lock().await.remove(request_id);
    }

    /// Settle the pending slot matching a serialized response.
    ///
    /// Responses that fail to parse, or whose id has no pending slot, are
    /// dropped.
    pub async fn handle_response(&self, raw: &str) {
        let response: Response = match serde_json::from_str(raw) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Bridge response loop: failed to parse inbound JSON: {e}");
                return;
            }
        };

        let slot = self.pending.lock().await.remove(&response.request_id);
        let Some(tx) = slot else {
            tracing::debug!(
                request_id = %response.request_id,
                "Dropping response for unknown or settled request"
            );
            return;
        };

        // The caller may have given up between removal and send.
        let _ = tx.send(response);
    }

    /// Fetch one page of conversations.
    pub async fn list_conversations(&self, offset: u32, limit: u32) -> Result<ConversationPage> {
        let payload = serde_json::to_value(ListPayload { offset, limit })?;
        let data = self
            .send(
                Request::new(MessageType::GetConversations, Some(payload)),
                self.options.request_timeout,
            )
            .await?;
        Ok(serde_json::from_value(data)?)
    }

    /// Search conversations by free text.
    pub async fn search_conversations(&self, query: &str, offset: u32) -> Result<ConversationPage> {
        let payload = serde_json::to_value(SearchPayload {
            query: query.to_string(),
            offset: Some(offset),
        })?;
        let data = self
            .send(
                Request::new(MessageType::SearchConversations, Some(payload)),
                self.options.request_timeout,
            )
            .await?;
        Ok(serde_json::from_value(data)?)
    }

    /// Soft-delete one conversation; `Ok(false)` when the context reports
    /// an unsuccessful delete without raising an error.
    pub async fn delete_conversation(&self, id: &str) -> Result<bool> {
        let payload = serde_json::to_value(DeletePayload { id: id.to_string() })?;
        let data = self
            .send(
                Request::new(MessageType::DeleteConversation, Some(payload)),
                self.options.request_timeout,
            )
            .await?;
        let result: DeleteResult = serde_json::from_value(data)?;
        Ok(result.success)
    }

    /// Ask the privileged context for its access token.
    pub async fn get_token(&self) -> Result<String> {
        let data = self
            .send(
                Request::new(MessageType::GetToken, None),
                self.options.request_timeout,
            )
            .await?;
        let token: TokenData = serde_json::from_value(data)?;
        Ok(token.access_token)
    }

    /// Probe the privileged context's session, with the shorter status
    /// deadline.
    pub async fn check_status(&self) -> Result<SessionStatus> {
        let data = self
            .send(
                Request::new(MessageType::CheckStatus, None),
                self.options.status_timeout,
            )
            .await?;
        Ok(serde_json::from_value(data)?)
    }
}

/// Start the response loop as a background Tokio task.
///
/// Reads serialized responses from `inbound_rx` and settles matching pending
/// requests on `bridge`. When `cancellation` fires or the inbound channel
/// closes, the pending table is cleared and the loop exits.
pub fn start_response_loop(
    mut inbound_rx: mpsc::UnboundedReceiver<String>,
    cancellation: CancellationToken,
    bridge: Arc<MessageBridge>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;

                _ = cancellation.cancelled() => {
                    bridge.pending.lock().await.clear();
                    break;
                }

                maybe_msg = inbound_rx.recv() => {
                    match maybe_msg {
                        Some(raw) => bridge.handle_response(&raw).await,
                        None => {
                            bridge.pending.lock().await.clear();
                            break;
                        }
                    }
                }
            }
        }
        tracing::debug!("Bridge response loop stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::transport::fake::{FakeTransport, FakeTransportHandle};

    /// Bridge over a fake transport with a running response loop.
    fn make_bridge() -> (
        Arc<MessageBridge>,
        FakeTransportHandle,
        mpsc::UnboundedSender<String>,
        CancellationToken,
    ) {
        let (transport, handle) = FakeTransport::new();
        make_bridge_with(transport, handle)
    }

    fn make_bridge_with(
        transport: FakeTransport,
        handle: FakeTransportHandle,
    ) -> (
        Arc<MessageBridge>,
        FakeTransportHandle,
        mpsc::UnboundedSender<String>,
        CancellationToken,
    ) {
        let (in_tx, in_rx) = mpsc::unbounded_channel::<String>();
        let token = CancellationToken::new();
        let bridge = Arc::new(MessageBridge::new(
            Arc::new(transport),
            BridgeOptions::new("https://chatgpt.com"),
        ));
        start_response_loop(in_rx, token.clone(), Arc::clone(&bridge));
        (bridge, handle, in_tx, token)
    }

    /// Read the next delivered request.
    async fn next_request(handle: &mut FakeTransportHandle) -> Request {
        let raw = handle.outbound_rx.recv().await.expect("request delivered");
        serde_json::from_str(&raw).expect("valid request json")
    }

    fn reply(in_tx: &mpsc::UnboundedSender<String>, response: &Response) {
        in_tx
            .send(serde_json::to_string(response).unwrap())
            .unwrap();
    }

    #[tokio::test]
    async fn test_send_resolves_with_matching_response() {
        let (bridge, mut handle, in_tx, _token) = make_bridge();

        let responder = tokio::spawn(async move {
            let request = next_request(&mut handle).await;
            assert_eq!(request.message_type, MessageType::GetToken);
            reply(
                &in_tx,
                &Response::ok(
                    request.request_id,
                    serde_json::json!({ "accessToken": "tok-1" }),
                ),
            );
        });

        let token = bridge.get_token().await.unwrap();
        assert_eq!(token, "tok-1");
        assert_eq!(bridge.pending_count().await, 0);
        responder.await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_response_surfaces_remote_error() {
        let (bridge, mut handle, in_tx, _token) = make_bridge();

        tokio::spawn(async move {
            let request = next_request(&mut handle).await;
            reply(&in_tx, &Response::err(request.request_id, "status 500"));
        });

        let err = bridge.delete_conversation("abc").await.unwrap_err();
        match err.downcast_ref::<SweepError>() {
            Some(SweepError::RemoteOperation { message, .. }) => {
                assert_eq!(message, "status 500")
            }
            other => panic!("expected RemoteOperation, got {other:?}"),
        }
        assert_eq!(bridge.pending_count().await, 0);
    }

    #[tokio::test]
    async fn test_no_target_context_fails_and_clears_slot() {
        let (transport, handle) = FakeTransport::new();
        let (bridge, _handle, _in_tx, _token) =
            make_bridge_with(transport.without_target(), handle);

        let err = bridge.get_token().await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SweepError>(),
            Some(SweepError::NoTargetContext(_))
        ));
        assert_eq!(bridge.pending_count().await, 0);
    }

    #[tokio::test]
    async fn test_delivery_failure_fails_and_clears_slot() {
        let (transport, handle) = FakeTransport::new();
        let (bridge, _handle, _in_tx, _token) =
            make_bridge_with(transport.with_failing_delivery(), handle);

        let err = bridge.list_conversations(0, 28).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SweepError>(),
            Some(SweepError::Delivery(_))
        ));
        assert_eq!(bridge.pending_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_rejects_and_late_response_is_dropped() {
        let (bridge, mut handle, in_tx, _token) = make_bridge();

        let err = bridge
            .send(
                Request::new(MessageType::GetToken, None),
                Duration::from_millis(200),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SweepError>(),
            Some(SweepError::RequestTimeout { .. })
        ));
        assert_eq!(bridge.pending_count().await, 0);

        // A late reply for the timed-out id must not settle anything.
        let late = next_request(&mut handle).await;
        reply(
            &in_tx,
            &Response::ok(late.request_id, serde_json::json!({ "accessToken": "x" })),
        );
        tokio::task::yield_now().await;
        assert_eq!(bridge.pending_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_check_uses_shorter_deadline() {
        let (bridge, _handle, _in_tx, _token) = make_bridge();

        let started = tokio::time::Instant::now();
        let err = bridge.check_status().await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SweepError>(),
            Some(SweepError::RequestTimeout { .. })
        ));
        let elapsed = started.elapsed();
        assert!(elapsed >= DEFAULT_STATUS_TIMEOUT);
        assert!(elapsed < DEFAULT_REQUEST_TIMEOUT);
    }

    #[tokio::test]
    async fn test_duplicate_response_is_noop() {
        let (bridge, mut handle, in_tx, _token) = make_bridge();

        let first = {
            let bridge = Arc::clone(&bridge);
            tokio::spawn(async move { bridge.get_token().await })
        };
        let request = next_request(&mut handle).await;

        let ok = Response::ok(
            request.request_id.clone(),
            serde_json::json!({ "accessToken": "first" }),
        );
        reply(&in_tx, &ok);
        reply(
            &in_tx,
            &Response::ok(
                request.request_id,
                serde_json::json!({ "accessToken": "second" }),
            ),
        );

        assert_eq!(first.await.unwrap().unwrap(), "first");
        assert_eq!(bridge.pending_count().await, 0);
    }

    #[tokio::test]
    async fn test_out_of_order_responses_are_correlated_by_id() {
        let (bridge, mut handle, in_tx, _token) = make_bridge();

        let a = {
            let bridge = Arc::clone(&bridge);
            tokio::spawn(async move { bridge.delete_conversation("a").await })
        };
        let req_a = next_request(&mut handle).await;
        let b = {
            let bridge = Arc::clone(&bridge);
            tokio::spawn(async move { bridge.delete_conversation("b").await })
        };
        let req_b = next_request(&mut handle).await;

        reply(
            &in_tx,
            &Response::ok(req_b.request_id, serde_json::json!({ "success": false })),
        );
        reply(
            &in_tx,
            &Response::ok(req_a.request_id, serde_json::json!({ "success": true })),
        );

        assert!(a.await.unwrap().unwrap());
        assert!(!b.await.unwrap().unwrap());
    }

    #[tokio::test]
    async fn test_unknown_id_is_dropped_silently() {
        let (bridge, _handle, _in_tx, _token) = make_bridge();
        bridge
            .handle_response(r#"{"success":true,"requestId":"nobody","data":{}}"#)
            .await;
        bridge.handle_response("not json").await;
        assert_eq!(bridge.pending_count().await, 0);
    }

    #[tokio::test]
    async fn test_cancelling_loop_fails_waiting_callers() {
        let (bridge, mut handle, _in_tx, token) = make_bridge();

        let waiting = {
            let bridge = Arc::clone(&bridge);
            tokio::spawn(async move { bridge.get_token().await })
        };
        let _ = next_request(&mut handle).await;
        token.cancel();

        let err = waiting.await.unwrap().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SweepError>(),
            Some(SweepError::Delivery(_))
        ));
    }

    #[tokio::test]
    async fn test_list_payload_is_sent() {
        let (bridge, mut handle, in_tx, _token) = make_bridge();

        tokio::spawn(async move {
            let request = next_request(&mut handle).await;
            assert_eq!(request.message_type, MessageType::GetConversations);
            assert_eq!(
                request.payload,
                Some(serde_json::json!({ "offset": 28, "limit": 28 }))
            );
            reply(
                &in_tx,
                &Response::ok(
                    request.request_id,
                    serde_json::json!({
                        "items": [{ "id": "c1", "title": "Hello" }],
                        "total": 29,
                        "offset": 28,
                        "limit": 28
                    }),
                ),
            );
        });

        let page = bridge.list_conversations(28, 28).await.unwrap();
        assert_eq!(page.total, Some(29));
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].title.as_deref(), Some("Hello"));
    }
}
