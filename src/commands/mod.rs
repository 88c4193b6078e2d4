/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

- `status`   -- liveness probe of the remote session
- `list`     -- paginated conversation listing
- `delete`   -- confirmed, paced batch delete with live progress
- `ignore`   -- ignore list management
- `logs`     -- operation log inspection
- `settings` -- persisted settings

Commands that reach the remote service run inside a [`Session`]: an
in-process privileged context (a [`ContentHost`] attached to a
[`LocalTransport`]) serving a [`MessageBridge`].
*/

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::bridge::{start_response_loop, LocalTransport, MessageBridge};
use crate::config::Config;
use crate::conversation::{merge, ConversationItem};
use crate::error::{Result, SweepError};
use crate::protocol::SessionStatus;
use crate::remote::{ContentHost, RemoteSessionClient, SystemClock};
use crate::storage::{AppStorage, CacheData, SledStore};

pub mod delete;
pub mod ignore;
pub mod list;
pub mod logs;
pub mod settings;
pub mod status;

/// Delay before the privileged context fetches its first token.
const TOKEN_PREWARM_DELAY: Duration = Duration::from_secs(1);

/// Open the configured store and write missing defaults.
pub fn open_storage(config: &Config) -> Result<AppStorage> {
    let path = config.storage.resolved_path()?;
    let store = SledStore::open(&path)?;
    let storage = AppStorage::new(Arc::new(store));
    storage.initialize()?;
    Ok(storage)
}

/// A running UI context and privileged context pair
pub struct Session {
    bridge: Arc<MessageBridge>,
    cancellation: CancellationToken,
    tasks: Vec<tokio::task::JoinHandle<()>>,
}

impl Session {
    /// Attach a privileged context for the configured origin and start
    /// the bridge response loop.
    pub async fn start(config: &Config) -> Result<Self> {
        let cancellation = CancellationToken::new();
        let (transport, inbound_rx) = LocalTransport::new();
        let transport = Arc::new(transport);

        let client = RemoteSessionClient::new(&config.remote, Arc::new(SystemClock))?;
        let host = Arc::new(ContentHost::new(Arc::new(client)).prewarm_after(TOKEN_PREWARM_DELAY));
        let endpoint = transport.attach(config.bridge.target_origin.clone()).await;
        let host_task = host.spawn(endpoint, cancellation.child_token());

        let bridge = Arc::new(MessageBridge::new(
            transport.clone(),
            config.bridge.to_options(),
        ));
        let loop_task =
            start_response_loop(inbound_rx, cancellation.child_token(), Arc::clone(&bridge));

        Ok(Self {
            bridge,
            cancellation,
            tasks: vec![host_task, loop_task],
        })
    }

    pub fn bridge(&self) -> Arc<MessageBridge> {
        Arc::clone(&self.bridge)
    }

    /// Check the remote session, failing unless it is signed in.
    pub async fn ensure_connected(&self) -> Result<SessionStatus> {
        match self.bridge.check_status().await {
            Ok(status) if status.is_connected() => Ok(status),
            Ok(_) => Err(SweepError::Auth(
                "not connected: the remote session is not signed in".to_string(),
            )
            .into()),
            Err(e) => Err(e.context("not connected")),
        }
    }

    /// Stop both contexts and wait for their tasks.
    pub async fn shutdown(self) {
        self.cancellation.cancel();
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::warn!("Session task ended abnormally: {e}");
            }
        }
    }
}

/// One loaded page of conversations
#[derive(Debug, Clone)]
pub struct LoadedPage {
    pub items: Vec<ConversationItem>,
    pub total: u32,
    pub ignored_total: usize,
}

/// Fetch a listing (or search results), merge it with the ignore list and
/// record the sync time.
pub async fn load_page(
    bridge: &MessageBridge,
    storage: &AppStorage,
    offset: u32,
    limit: u32,
    query: Option<&str>,
) -> Result<LoadedPage> {
    let page = match query {
        Some(q) if !q.trim().is_empty() => bridge.search_conversations(q.trim(), offset).await?,
        _ => bridge.list_conversations(offset, limit).await?,
    };

    let ignore = storage.ignore_list()?;
    let items = merge(&page.items, &ignore);
    storage.set_cache(CacheData {
        last_sync: Some(chrono::Utc::now()),
        ..CacheData::default()
    })?;

    tracing::debug!(count = items.len(), total = page.total_or_len(), "Loaded conversations");

    Ok(LoadedPage {
        total: page.total_or_len(),
        items,
        ignored_total: ignore.len(),
    })
}
