//! Request handler for the privileged context
//!
//! A [`ContentHost`] serves one [`HostEndpoint`]: it reads serialized request
//! envelopes, executes them against its [`RemoteSessionClient`], and writes
//! one response envelope per request. Requests are handled concurrently, so
//! responses may leave in a different order than requests arrived.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::bridge::HostEndpoint;
use crate::error::{Result, SweepError};
use crate::protocol::{
    DeletePayload, DeleteResult, ListPayload, MessageType, Response, SearchPayload, TokenData,
};
use crate::remote::session::RemoteSessionClient;

/// Executes bridge requests on behalf of the UI context.
#[derive(Debug)]
pub struct ContentHost {
    client: Arc<RemoteSessionClient>,
    prewarm_after: Option<Duration>,
}

impl ContentHost {
    /// Create a host serving requests with `client`.
    pub fn new(client: Arc<RemoteSessionClient>) -> Self {
        Self {
            client,
            prewarm_after: None,
        }
    }

    /// Fetch and cache a token `delay` after the host starts serving.
    pub fn prewarm_after(mut self, delay: Duration) -> Self {
        self.prewarm_after = Some(delay);
        self
    }

    /// Handle one serialized request.
    ///
    /// Returns `None` for messages that are not request envelopes (missing
    /// `type` or `requestId`); such messages get no response.
    pub async fn handle_message(&self, raw: &str) -> Option<Response> {
        let value: serde_json::Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("Content host: failed to parse inbound JSON: {e}");
                return None;
            }
        };

        let message_type = value.get("type").and_then(|t| t.as_str())?;
        let request_id = value.get("requestId").and_then(|r| r.as_str())?;
        let payload = value
            .get("payload")
            .cloned()
            .unwrap_or(serde_json::Value::Null);

        tracing::debug!(request_id, message_type, "Content host received request");

        let outcome = match MessageType::from_wire(message_type) {
            Some(kind) => self.execute(kind, payload).await,
            None => Err(SweepError::remote(format!("Unknown message type: {message_type}")).into()),
        };

        Some(match outcome {
            Ok(data) => Response::ok(request_id, data),
            Err(e) => {
                tracing::debug!(request_id, "Request failed: {e}");
                Response::err(request_id, e.to_string())
            }
        })
    }

    async fn execute(
        &self,
        kind: MessageType,
        payload: serde_json::Value,
    ) -> Result<serde_json::Value> {
        match kind {
            MessageType::GetConversations => {
                let ListPayload { offset, limit } = serde_json::from_value(payload)?;
                let page = self.client.list(offset, limit).await?;
                Ok(serde_json::to_value(page)?)
            }
            MessageType::SearchConversations => {
                let SearchPayload { query, offset } = serde_json::from_value(payload)?;
                let page = self.client.search(&query, offset.unwrap_or(0)).await?;
                Ok(serde_json::to_value(page)?)
            }
            MessageType::DeleteConversation => {
                let DeletePayload { id } = serde_json::from_value(payload)?;
                let success = self.client.delete(&id).await?;
                Ok(serde_json::to_value(DeleteResult { success })?)
            }
            MessageType::GetToken => {
                let access_token = self.client.get_token().await?;
                Ok(serde_json::to_value(TokenData { access_token })?)
            }
            MessageType::CheckStatus => Ok(serde_json::to_value(self.client.check_status().await)?),
        }
    }

    /// Serve `endpoint` as a background task until `cancellation` fires or
    /// the request channel closes.
    ///
    /// Dropping the endpoint on exit makes the context unreachable for the
    /// bridge.
    pub fn spawn(
        self: Arc<Self>,
        mut endpoint: HostEndpoint,
        cancellation: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        if let Some(delay) = self.prewarm_after {
            let client = Arc::clone(&self.client);
            let cancel = cancellation.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = tokio::time::sleep(delay) => {
                        if let Err(e) = client.get_token().await {
                            tracing::warn!("Failed to cache access token: {e}");
                        }
                    }
                }
            });
        }

        tokio::spawn(async move {
            tracing::info!(context = %endpoint.id, origin = %endpoint.origin, "Content host serving");
            loop {
                tokio::select! {
                    biased;

                    _ = cancellation.cancelled() => break,

                    maybe_msg = endpoint.requests.recv() => {
                        let Some(raw) = maybe_msg else { break };
                        let host = Arc::clone(&self);
                        let responses = endpoint.responses.clone();
                        tokio::spawn(async move {
                            let Some(response) = host.handle_message(&raw).await else {
                                return;
                            };
                            match serde_json::to_string(&response) {
                                Ok(serialized) => {
                                    if responses.send(serialized).is_err() {
                                        tracing::debug!("Response channel closed; dropping response");
                                    }
                                }
                                Err(e) => tracing::error!("Failed to serialize response: {e}"),
                            }
                        });
                    }
                }
            }
            tracing::info!(context = %endpoint.id, "Content host stopped");
        })
    }
}
