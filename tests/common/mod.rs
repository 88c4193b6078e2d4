use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use chatsweep::bridge::{start_response_loop, BridgeOptions, LocalTransport, MessageBridge};
use chatsweep::config::RemoteConfig;
use chatsweep::remote::{ContentHost, RemoteSessionClient, SystemClock};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const ORIGIN: &str = "https://chatgpt.com";

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// Session endpoint answering with a signed-in user and `token`.
#[allow(dead_code)]
pub async fn mount_session(server: &MockServer, token: &str) {
    Mock::given(method("GET"))
        .and(path("/api/auth/session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": { "id": "user-1", "name": "Test" },
            "accessToken": token,
        })))
        .mount(server)
        .await;
}

/// A listing body with `ids` titled `Chat <id>`.
#[allow(dead_code)]
pub fn conversation_page(ids: &[&str], total: u32) -> Value {
    let items: Vec<Value> = ids
        .iter()
        .map(|id| {
            json!({
                "id": id,
                "title": format!("Chat {id}"),
                "create_time": 1714557600.0,
                "update_time": "2024-05-02T08:30:00.000000+00:00",
            })
        })
        .collect();
    json!({ "items": items, "total": total, "limit": 28, "offset": 0 })
}

/// UI and privileged contexts wired over an in-process transport.
#[allow(dead_code)]
pub struct Harness {
    pub bridge: Arc<MessageBridge>,
    pub transport: Arc<LocalTransport>,
    pub cancel: CancellationToken,
    pub host_cancel: CancellationToken,
    pub host_task: tokio::task::JoinHandle<()>,
}

#[allow(dead_code)]
pub async fn harness(server: &MockServer, options: BridgeOptions) -> Harness {
    let cancel = CancellationToken::new();
    let host_cancel = cancel.child_token();
    let (transport, inbound) = LocalTransport::new();
    let transport = Arc::new(transport);

    let config = RemoteConfig {
        base_url: server.uri(),
        session_cookie: Some("__Secure-session=abc".to_string()),
        ..RemoteConfig::default()
    };
    let client = RemoteSessionClient::new(&config, Arc::new(SystemClock)).expect("client");
    let endpoint = transport.attach(ORIGIN).await;
    let host_task = Arc::new(ContentHost::new(Arc::new(client))).spawn(endpoint, host_cancel.clone());

    let bridge = Arc::new(MessageBridge::new(transport.clone(), options));
    start_response_loop(inbound, cancel.clone(), Arc::clone(&bridge));

    Harness {
        bridge,
        transport,
        cancel,
        host_cancel,
        host_task,
    }
}
