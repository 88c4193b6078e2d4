//! Remote session client running inside the privileged context
//!
//! [`RemoteSessionClient`] performs the four remote operations (session,
//! list, search, soft-delete) against the chat service and owns a
//! short-lived cached access token.
//!
//! The token is cached for a fixed lifetime shorter than the real one and is
//! only ever replaced by a complete assignment, never revoked. A 401 from the
//! service is surfaced as a [`SweepError::RemoteOperation`]; there is no
//! automatic re-authentication.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response as HttpResponse, StatusCode};
use serde::Deserialize;
use tokio::sync::RwLock;
use url::Url;

use crate::config::RemoteConfig;
use crate::error::{Result, SweepError};
use crate::protocol::{ConversationPage, SessionStatus};
use crate::remote::clock::Clock;

const SESSION_PATH: &str = "api/auth/session";
const CONVERSATIONS_PATH: &str = "backend-api/conversations";
const SEARCH_PATH: &str = "backend-api/conversations/search";
const CONVERSATION_PATH: &str = "backend-api/conversation/";

/// Access token plus the instant after which it is no longer used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    /// `true` while `now` is strictly before expiry.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Subset of the session endpoint's response that matters here.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    #[serde(default)]
    user: Option<serde_json::Value>,
    #[serde(default)]
    access_token: Option<String>,
}

/// Client for the chat service's session-authenticated API.
#[derive(Debug)]
pub struct RemoteSessionClient {
    http: Client,
    base_url: Url,
    session_cookie: Option<String>,
    token_ttl: chrono::Duration,
    clock: Arc<dyn Clock>,
    cache: RwLock<Option<CachedToken>>,
}

impl RemoteSessionClient {
    /// Create a client from configuration and a time source.
    ///
    /// # Errors
    ///
    /// Returns [`SweepError::Config`] when the base URL is invalid or the
    /// HTTP client cannot be built.
    pub fn new(config: &RemoteConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let mut base_url = Url::parse(&config.base_url)
            .map_err(|e| SweepError::Config(format!("Invalid base_url: {e}")))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .user_agent(concat!("chatsweep/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SweepError::Config(format!("Failed to create HTTP client: {e}")))?;

        tracing::info!(base_url = %base_url, "Initialized remote session client");

        Ok(Self {
            http,
            base_url,
            session_cookie: config.session_cookie.clone(),
            token_ttl: chrono::Duration::seconds(config.token_ttl_secs as i64),
            clock,
            cache: RwLock::new(None),
        })
    }

    /// Snapshot of the cached token, if any.
    pub async fn cached_token(&self) -> Option<CachedToken> {
        self.cache.read().await.clone()
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| SweepError::Config(format!("Invalid endpoint {path}: {e}")).into())
    }

    fn with_session(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.session_cookie {
            Some(cookie) => builder.header(reqwest::header::COOKIE, cookie),
            None => builder,
        }
    }

    async fn fetch_session(&self) -> Result<SessionResponse> {
        let url = self.endpoint(SESSION_PATH)?;
        let response = self
            .with_session(self.http.get(url))
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SweepError::Auth(format!("Session request failed: {}", status.as_u16())).into());
        }

        Ok(response.json::<SessionResponse>().await?)
    }

    /// Return the cached token, fetching a fresh session when expired.
    ///
    /// # Errors
    ///
    /// Returns [`SweepError::Auth`] if the session fetch fails or carries no
    /// access token.
    pub async fn get_token(&self) -> Result<String> {
        let now = self.clock.now();
        if let Some(cached) = self.cache.read().await.as_ref() {
            if cached.is_valid_at(now) {
                return Ok(cached.token.clone());
            }
        }

        let session = self.fetch_session().await.map_err(|e| match e.downcast::<SweepError>() {
            Ok(SweepError::Auth(msg)) => SweepError::Auth(format!("Failed to get access token: {msg}")),
            Ok(other) => SweepError::Auth(format!("Failed to get access token: {other}")),
            Err(other) => SweepError::Auth(format!("Failed to get access token: {other}")),
        })?;

        let token = session
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| SweepError::Auth("No access token in session response".to_string()))?;

        let cached = CachedToken {
            token: token.clone(),
            expires_at: self.clock.now() + self.token_ttl,
        };
        tracing::debug!(expires_at = %cached.expires_at, "Cached fresh access token");
        *self.cache.write().await = Some(cached);

        Ok(token)
    }

    /// Probe the session without touching the token cache.
    ///
    /// Never fails: any error reads as logged out.
    pub async fn check_status(&self) -> SessionStatus {
        match self.fetch_session().await {
            Ok(session) => SessionStatus {
                is_logged_in: session.user.map(|u| !u.is_null()).unwrap_or(false),
                has_access: session.access_token.map(|t| !t.is_empty()).unwrap_or(false),
            },
            Err(e) => {
                tracing::debug!("Session status probe failed: {e}");
                SessionStatus::default()
            }
        }
    }

    async fn authorized(&self, builder: RequestBuilder) -> Result<RequestBuilder> {
        let token = self.get_token().await?;
        Ok(self
            .with_session(builder)
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, "*/*")
            .header(reqwest::header::CONTENT_TYPE, "application/json"))
    }

    /// Fetch one page of non-archived conversations, newest update first.
    pub async fn list(&self, offset: u32, limit: u32) -> Result<ConversationPage> {
        let mut url = self.endpoint(CONVERSATIONS_PATH)?;
        url.query_pairs_mut()
            .append_pair("offset", &offset.to_string())
            .append_pair("limit", &limit.to_string())
            .append_pair("order", "updated")
            .append_pair("is_archived", "false");

        let response = self.authorized(self.http.get(url)).await?.send().await?;
        let response = ensure_success(response, "Failed to fetch conversations")?;
        Ok(response.json::<ConversationPage>().await?)
    }

    /// Search conversations by free text.
    ///
    /// The service paginates search with an opaque cursor, so `offset` is
    /// accepted for protocol symmetry but always starts from the first page.
    pub async fn search(&self, query: &str, offset: u32) -> Result<ConversationPage> {
        let mut url = self.endpoint(SEARCH_PATH)?;
        url.query_pairs_mut()
            .append_pair("query", query)
            .append_pair("cursor", "");
        tracing::debug!(query, offset, "Searching conversations");

        let response = self.authorized(self.http.get(url)).await?.send().await?;
        let response = ensure_success(response, "Failed to search conversations")?;
        Ok(response.json::<ConversationPage>().await?)
    }

    /// Soft-delete a conversation by hiding it.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let mut url = self.endpoint(CONVERSATION_PATH)?;
        url.path_segments_mut()
            .map_err(|_| SweepError::Config("base_url cannot carry a path".to_string()))?
            .pop_if_empty()
            .push(id);

        let response = self
            .authorized(self.http.patch(url))
            .await?
            .json(&serde_json::json!({ "is_visible": false }))
            .send()
            .await?;
        ensure_success(response, "Failed to delete conversation")?;
        tracing::debug!(conversation_id = id, "Conversation hidden");
        Ok(true)
    }
}

fn ensure_success(response: HttpResponse, context: &str) -> Result<HttpResponse> {
    let status: StatusCode = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(SweepError::remote_status(status.as_u16(), format!("{context}: {status}")).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::clock::ManualClock;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> RemoteConfig {
        RemoteConfig {
            base_url: server.uri(),
            session_cookie: Some("session=abc".to_string()),
            ..RemoteConfig::default()
        }
    }

    fn client_with_clock(server: &MockServer) -> (RemoteSessionClient, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let client = RemoteSessionClient::new(&config_for(server), clock.clone()).unwrap();
        (client, clock)
    }

    async fn mount_session(server: &MockServer, token: &str, expected_calls: u64) {
        Mock::given(method("GET"))
            .and(path("/api/auth/session"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "user": { "id": "u1" },
                "accessToken": token
            })))
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_get_token_is_cached_within_window() {
        let server = MockServer::start().await;
        mount_session(&server, "tok-1", 1).await;
        let (client, clock) = client_with_clock(&server);

        assert_eq!(client.get_token().await.unwrap(), "tok-1");
        clock.advance(chrono::Duration::minutes(54));
        assert_eq!(client.get_token().await.unwrap(), "tok-1");
    }

    #[tokio::test]
    async fn test_get_token_refetches_after_expiry() {
        let server = MockServer::start().await;
        mount_session(&server, "tok-2", 2).await;
        let (client, clock) = client_with_clock(&server);

        client.get_token().await.unwrap();
        let first = client.cached_token().await.unwrap();

        clock.advance(chrono::Duration::minutes(55));
        client.get_token().await.unwrap();
        let second = client.cached_token().await.unwrap();

        assert!(second.expires_at > first.expires_at);
        assert_eq!(second.expires_at - first.expires_at, chrono::Duration::minutes(55));
    }

    #[tokio::test]
    async fn test_get_token_without_token_is_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/auth/session"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;
        let (client, _clock) = client_with_clock(&server);

        let err = client.get_token().await.unwrap_err();
        assert!(matches!(err.downcast_ref::<SweepError>(), Some(SweepError::Auth(_))));
        assert!(client.cached_token().await.is_none());
    }

    #[tokio::test]
    async fn test_get_token_session_failure_is_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/auth/session"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;
        let (client, _clock) = client_with_clock(&server);

        let err = client.get_token().await.unwrap_err();
        match err.downcast_ref::<SweepError>() {
            Some(SweepError::Auth(msg)) => assert!(msg.contains("403"), "{msg}"),
            other => panic!("expected Auth, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_check_status_reports_login_and_access() {
        let server = MockServer::start().await;
        mount_session(&server, "tok", 1).await;
        let (client, _clock) = client_with_clock(&server);

        let status = client.check_status().await;
        assert!(status.is_logged_in);
        assert!(status.has_access);
        assert!(client.cached_token().await.is_none());
    }

    #[tokio::test]
    async fn test_check_status_swallows_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/auth/session"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;
        let (client, _clock) = client_with_clock(&server);

        assert_eq!(client.check_status().await, SessionStatus::default());
    }

    #[tokio::test]
    async fn test_check_status_unreachable_host_is_logged_out() {
        let config = RemoteConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            http_timeout_secs: 2,
            ..RemoteConfig::default()
        };
        let client = RemoteSessionClient::new(&config, Arc::new(ManualClock::new(Utc::now())))
            .unwrap();
        let status = client.check_status().await;
        assert!(!status.is_logged_in);
        assert!(!status.has_access);
    }

    #[tokio::test]
    async fn test_list_sends_bearer_and_query() {
        let server = MockServer::start().await;
        mount_session(&server, "tok-list", 1).await;
        Mock::given(method("GET"))
            .and(path("/backend-api/conversations"))
            .and(query_param("offset", "0"))
            .and(query_param("limit", "28"))
            .and(query_param("order", "updated"))
            .and(query_param("is_archived", "false"))
            .and(header("authorization", "Bearer tok-list"))
            .and(header("cookie", "session=abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [
                    { "id": "c1", "title": "First", "create_time": "2024-05-01T10:00:00Z" },
                    { "id": "c2", "title": null }
                ],
                "total": 2,
                "offset": 0,
                "limit": 28,
                "has_missing_conversations": false
            })))
            .expect(1)
            .mount(&server)
            .await;
        let (client, _clock) = client_with_clock(&server);

        let page = client.list(0, 28).await.unwrap();
        assert_eq!(page.total, Some(2));
        assert_eq!(page.items[0].id, "c1");
        assert_eq!(page.items[1].title, None);
    }

    #[tokio::test]
    async fn test_list_non_success_carries_status() {
        let server = MockServer::start().await;
        mount_session(&server, "tok", 1).await;
        Mock::given(method("GET"))
            .and(path("/backend-api/conversations"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        let (client, _clock) = client_with_clock(&server);

        let err = client.list(0, 28).await.unwrap_err();
        match err.downcast_ref::<SweepError>() {
            Some(SweepError::RemoteOperation { status, message }) => {
                assert_eq!(*status, Some(401));
                assert!(message.starts_with("Failed to fetch conversations"));
            }
            other => panic!("expected RemoteOperation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_search_encodes_query() {
        let server = MockServer::start().await;
        mount_session(&server, "tok", 1).await;
        Mock::given(method("GET"))
            .and(path("/backend-api/conversations/search"))
            .and(query_param("query", "rust & tokio"))
            .and(query_param("cursor", ""))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [{ "conversation_id": "s1", "title": "Rust" }]
            })))
            .expect(1)
            .mount(&server)
            .await;
        let (client, _clock) = client_with_clock(&server);

        let page = client.search("rust & tokio", 0).await.unwrap();
        assert_eq!(page.items[0].id, "s1");
        assert_eq!(page.total_or_len(), 1);
    }

    #[tokio::test]
    async fn test_delete_patches_visibility_flag() {
        let server = MockServer::start().await;
        mount_session(&server, "tok", 1).await;
        Mock::given(method("PATCH"))
            .and(path("/backend-api/conversation/abc-123"))
            .and(body_json(serde_json::json!({ "is_visible": false })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "success": true })))
            .expect(1)
            .mount(&server)
            .await;
        let (client, _clock) = client_with_clock(&server);

        assert!(client.delete("abc-123").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_failure_is_remote_error() {
        let server = MockServer::start().await;
        mount_session(&server, "tok", 1).await;
        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let (client, _clock) = client_with_clock(&server);

        let err = client.delete("abc").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SweepError>(),
            Some(SweepError::RemoteOperation { status: Some(500), .. })
        ));
    }

    #[test]
    fn test_cached_token_validity_is_strict() {
        let now = Utc::now();
        let token = CachedToken {
            token: "t".to_string(),
            expires_at: now,
        };
        assert!(!token.is_valid_at(now));
        assert!(token.is_valid_at(now - chrono::Duration::seconds(1)));
    }
}
