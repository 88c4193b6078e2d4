use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::{BatchState, ConversationDeleter, DeleteProgress};
use crate::conversation::BatchKind;
use crate::error::{Result, SweepError};
use crate::protocol::generate_request_id;
use crate::storage::{FailureRecord, OperationLogEntry};

/// Reason recorded when the remote answers a delete with `success: false`.
pub const DECLINED_REASON: &str = "Delete request failed";

/// A delay drawn uniformly from `[0.5 * base, 1.5 * base]`.
pub fn jittered_delay(base: Duration) -> Duration {
    if base.is_zero() {
        return base;
    }
    base.mul_f64(rand::rng().random_range(0.5..=1.5))
}

/// Drives one batch delete at a time.
pub struct BatchDeleter {
    deleter: Arc<dyn ConversationDeleter>,
    delete_delay: Duration,
    state: Mutex<BatchState>,
    cancellation: Mutex<Option<CancellationToken>>,
    progress: watch::Sender<DeleteProgress>,
}

impl std::fmt::Debug for BatchDeleter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchDeleter")
            .field("delete_delay", &self.delete_delay)
            .field("state", &self.state())
            .finish()
    }
}

/// Returns the deleter to a terminal state even if `run` is dropped early.
struct RunGuard<'a> {
    owner: &'a BatchDeleter,
    finished: Option<BatchState>,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        let final_state = self.finished.unwrap_or(BatchState::Cancelled);
        *lock(&self.owner.state) = final_state;
        *lock(&self.owner.cancellation) = None;
        self.owner.progress.send_modify(|p| {
            p.is_running = false;
            p.can_cancel = false;
        });
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl BatchDeleter {
    /// Create a deleter pacing requests around `delete_delay`.
    pub fn new(deleter: Arc<dyn ConversationDeleter>, delete_delay: Duration) -> Self {
        let (progress, _) = watch::channel(DeleteProgress::default());
        Self {
            deleter,
            delete_delay,
            state: Mutex::new(BatchState::Idle),
            cancellation: Mutex::new(None),
            progress,
        }
    }

    /// Current state of the batch state machine.
    pub fn state(&self) -> BatchState {
        *lock(&self.state)
    }

    /// Subscribe to progress snapshots.
    pub fn subscribe(&self) -> watch::Receiver<DeleteProgress> {
        self.progress.subscribe()
    }

    /// Latest progress snapshot.
    pub fn progress(&self) -> DeleteProgress {
        self.progress.borrow().clone()
    }

    /// Ask the running batch to stop before its next item.
    ///
    /// A delete already in flight still completes. No-op when idle.
    pub fn cancel(&self) {
        if let Some(token) = lock(&self.cancellation).as_ref() {
            tracing::info!("Batch cancellation requested");
            token.cancel();
        }
    }

    /// Delete `ids` in order and summarize the outcome.
    ///
    /// Per-item failures are recorded, never propagated. Cancelling
    /// `cancellation` (or calling [`Self::cancel`]) stops the batch before
    /// the next item starts.
    ///
    /// # Errors
    ///
    /// Returns [`SweepError::BatchInProgress`] if another run is active.
    pub async fn run<F>(
        &self,
        ids: &[String],
        title_lookup: F,
        kind: BatchKind,
        cancellation: CancellationToken,
    ) -> Result<OperationLogEntry>
    where
        F: Fn(&str) -> String + Send + Sync,
    {
        {
            let mut state = lock(&self.state);
            if *state == BatchState::Running {
                return Err(SweepError::BatchInProgress.into());
            }
            *state = BatchState::Running;
        }
        *lock(&self.cancellation) = Some(cancellation.clone());
        let mut guard = RunGuard {
            owner: self,
            finished: None,
        };

        let total = ids.len();
        self.progress.send_replace(DeleteProgress {
            total,
            is_running: true,
            can_cancel: true,
            ..DeleteProgress::default()
        });
        tracing::info!(total, %kind, "Batch delete started");

        let mut failures = Vec::new();
        let mut success = 0;

        for (index, id) in ids.iter().enumerate() {
            if cancellation.is_cancelled() {
                break;
            }

            let title = title_lookup(id);
            self.progress
                .send_modify(|p| p.current_title = title.clone());

            let outcome = self.deleter.delete(id).await;
            let ok = match outcome {
                Ok(true) => true,
                Ok(false) => {
                    failures.push(FailureRecord {
                        id: id.clone(),
                        title,
                        reason: DECLINED_REASON.to_string(),
                    });
                    false
                }
                Err(e) => {
                    tracing::warn!(id = %id, "Delete failed: {e}");
                    failures.push(FailureRecord {
                        id: id.clone(),
                        title,
                        reason: e.to_string(),
                    });
                    false
                }
            };
            if ok {
                success += 1;
            }

            self.progress.send_modify(|p| {
                p.current += 1;
                if ok {
                    p.success += 1;
                } else {
                    p.failed += 1;
                }
            });

            if index + 1 < total {
                let delay = jittered_delay(self.delete_delay);
                tokio::select! {
                    _ = cancellation.cancelled() => {}
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }

        let attempted = success + failures.len();
        let final_state = if attempted < total {
            BatchState::Cancelled
        } else {
            BatchState::Completed
        };
        guard.finished = Some(final_state);
        drop(guard);

        tracing::info!(
            total,
            success,
            failed = failures.len(),
            cancelled = final_state == BatchState::Cancelled,
            "Batch delete finished"
        );

        Ok(OperationLogEntry {
            id: generate_request_id(),
            kind,
            timestamp: Utc::now(),
            total,
            success,
            failed: failures.len(),
            failures,
        })
    }
}
