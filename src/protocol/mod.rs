//! Wire protocol between the UI context and the privileged context
//!
//! Every exchange is a single JSON request envelope answered by a single JSON
//! response envelope carrying the same `requestId`:
//!
//! ```text
//! Request:  { "type": "...", "requestId": "...", "payload": {...} }
//! Response: { "success": bool, "requestId": "...", "data": {...}, "error": "..." }
//! ```
//!
//! Payload and data shapes are defined per [`MessageType`] below.

use chrono::{DateTime, TimeZone, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Number of random base36 characters appended to a request id.
const REQUEST_ID_SUFFIX_LEN: usize = 9;

/// Request kinds understood by the privileged context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    /// Fetch one page of conversations
    GetConversations,
    /// Search conversations by free-text query
    SearchConversations,
    /// Soft-delete one conversation
    DeleteConversation,
    /// Return the session access token
    GetToken,
    /// Liveness probe of the authenticated session
    CheckStatus,
}

impl MessageType {
    /// Wire name of this message type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GetConversations => "GET_CONVERSATIONS",
            Self::SearchConversations => "SEARCH_CONVERSATIONS",
            Self::DeleteConversation => "DELETE_CONVERSATION",
            Self::GetToken => "GET_TOKEN",
            Self::CheckStatus => "CHECK_STATUS",
        }
    }

    /// Parse a wire name, returning `None` for unknown types.
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "GET_CONVERSATIONS" => Some(Self::GetConversations),
            "SEARCH_CONVERSATIONS" => Some(Self::SearchConversations),
            "DELETE_CONVERSATION" => Some(Self::DeleteConversation),
            "GET_TOKEN" => Some(Self::GetToken),
            "CHECK_STATUS" => Some(Self::CheckStatus),
            _ => None,
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request envelope sent from the UI context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    /// Operation requested
    #[serde(rename = "type")]
    pub message_type: MessageType,
    /// Correlation id; answered by exactly one response
    pub request_id: String,
    /// Operation-specific fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl Request {
    /// Build a request with a freshly generated id.
    pub fn new(message_type: MessageType, payload: Option<serde_json::Value>) -> Self {
        Self {
            message_type,
            request_id: generate_request_id(),
            payload,
        }
    }
}

/// Response envelope sent back by the privileged context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    /// Whether the operation succeeded
    pub success: bool,
    /// Correlation id copied from the request
    pub request_id: String,
    /// Operation result on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Failure message when `success` is false
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    /// Successful response carrying `data`.
    pub fn ok(request_id: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            success: true,
            request_id: request_id.into(),
            data: Some(data),
            error: None,
        }
    }

    /// Failed response carrying an error message.
    pub fn err(request_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            request_id: request_id.into(),
            data: None,
            error: Some(error.into()),
        }
    }
}

/// Payload of [`MessageType::GetConversations`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListPayload {
    pub offset: u32,
    pub limit: u32,
}

/// Payload of [`MessageType::SearchConversations`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchPayload {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
}

/// Payload of [`MessageType::DeleteConversation`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletePayload {
    pub id: String,
}

/// Timestamp as reported by the remote: ISO-8601 text or epoch seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RemoteTime {
    Epoch(f64),
    Text(String),
}

impl RemoteTime {
    /// Convert to a UTC timestamp, `None` when unparseable.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Epoch(secs) => {
                let millis = (secs * 1000.0).round() as i64;
                Utc.timestamp_millis_opt(millis).single()
            }
            Self::Text(text) => DateTime::parse_from_rfc3339(text)
                .map(|dt| dt.with_timezone(&Utc))
                .ok(),
        }
    }
}

/// A conversation as listed by the remote service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteConversation {
    #[serde(alias = "conversation_id")]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub create_time: Option<RemoteTime>,
    #[serde(default)]
    pub update_time: Option<RemoteTime>,
}

/// Data of list and search responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationPage {
    #[serde(default)]
    pub items: Vec<RemoteConversation>,
    #[serde(default)]
    pub total: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_missing_conversations: Option<bool>,
}

impl ConversationPage {
    /// Total reported by the remote, or the number of items when absent.
    pub fn total_or_len(&self) -> u32 {
        self.total
            .filter(|t| *t > 0)
            .unwrap_or(self.items.len() as u32)
    }
}

/// Data of delete responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResult {
    pub success: bool,
}

/// Data of token responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenData {
    pub access_token: String,
}

/// Data of status responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub is_logged_in: bool,
    pub has_access: bool,
}

impl SessionStatus {
    /// Both logged in and holding a usable token.
    pub fn is_connected(&self) -> bool {
        self.is_logged_in && self.has_access
    }
}

/// Generate a request id of the form `<unix-millis>-<9 base36 chars>`.
///
/// Collision resistant within a session; not suitable as a secret.
pub fn generate_request_id() -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..REQUEST_ID_SUFFIX_LEN)
        .map(|_| std::char::from_digit(rng.random_range(0..36u32), 36).unwrap_or('0'))
        .collect();
    format!("{}-{}", Utc::now().timestamp_millis(), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_message_type_wire_names() {
        let json = serde_json::to_string(&MessageType::DeleteConversation).unwrap();
        assert_eq!(json, "\"DELETE_CONVERSATION\"");
        assert_eq!(
            MessageType::from_wire("CHECK_STATUS"),
            Some(MessageType::CheckStatus)
        );
        assert_eq!(MessageType::from_wire("REBOOT"), None);
    }

    #[test]
    fn test_request_serializes_camel_case_without_empty_payload() {
        let request = Request {
            message_type: MessageType::GetToken,
            request_id: "1-abc".to_string(),
            payload: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({ "type": "GET_TOKEN", "requestId": "1-abc" })
        );
    }

    #[test]
    fn test_response_parses_failure() {
        let response: Response = serde_json::from_str(
            r#"{"success":false,"requestId":"7-x","error":"Failed to delete conversation: 500"}"#,
        )
        .unwrap();
        assert!(!response.success);
        assert_eq!(response.data, None);
        assert_eq!(
            response.error.as_deref(),
            Some("Failed to delete conversation: 500")
        );
    }

    #[test]
    fn test_request_id_shape() {
        let id = generate_request_id();
        let (millis, suffix) = id.split_once('-').expect("dash separator");
        assert!(millis.parse::<i64>().is_ok());
        assert_eq!(suffix.len(), REQUEST_ID_SUFFIX_LEN);
        assert!(suffix
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn test_request_ids_do_not_collide() {
        let ids: HashSet<String> = (0..1000).map(|_| generate_request_id()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_conversation_page_accepts_search_shape() {
        let page: ConversationPage = serde_json::from_value(serde_json::json!({
            "items": [
                { "conversation_id": "abc", "title": "Trip", "update_time": 1700000000.5 }
            ],
            "cursor": null
        }))
        .unwrap();
        assert_eq!(page.items[0].id, "abc");
        assert_eq!(page.total, None);
        assert_eq!(page.total_or_len(), 1);
        assert!(page.items[0]
            .update_time
            .as_ref()
            .and_then(RemoteTime::to_datetime)
            .is_some());
    }

    #[test]
    fn test_remote_time_parses_iso_text() {
        let t = RemoteTime::Text("2024-05-01T10:00:00.000000Z".to_string());
        let dt = t.to_datetime().expect("parse");
        assert_eq!(dt.timestamp(), 1_714_557_600);
        assert_eq!(RemoteTime::Text("yesterday".to_string()).to_datetime(), None);
    }

    #[test]
    fn test_session_status_wire_shape() {
        let status: SessionStatus =
            serde_json::from_str(r#"{"isLoggedIn":true,"hasAccess":false}"#).unwrap();
        assert!(status.is_logged_in);
        assert!(!status.is_connected());
    }
}
