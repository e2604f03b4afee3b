//! Sync orchestrator.
//!
//! Sequences the pull-merge-persist cycle and the debounced push, owns the
//! status surface, and guards the critical section with a real mutex so
//! overlapping triggers (login, app foreground, manual retry) cannot run
//! two cycles at once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, RwLock as StdRwLock};

use chrono::Utc;
use log::{debug, error, info, warn};
use shared::Snapshot;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::time::{sleep_until, Duration, Instant};

use super::merge::{merge, merge_appointments};
use super::remote::RemoteBlobChannel;
use super::{ChangeSignal, SyncError, SyncStatus};
use crate::config::SyncConfig;
use crate::domain::invariants::clear_completed_vaccines;
use crate::state::{AppData, StateCache};
use crate::storage::JsonConnection;

/// Handle to the sync engine. Cloning is cheap; all clones share state.
#[derive(Clone)]
pub struct SyncService {
    inner: Arc<SyncInner>,
}

struct SyncInner {
    config: SyncConfig,
    connection: Arc<JsonConnection>,
    remote: Arc<dyn RemoteBlobChannel>,
    state: StateCache,
    status: StdRwLock<SyncStatus>,
    linked: AtomicBool,
    /// Serializes pull-merge-persist cycles; an overlapping trigger is
    /// skipped rather than queued.
    pull_gate: tokio::sync::Mutex<()>,
    changes_tx: UnboundedSender<()>,
    changes_rx: StdMutex<Option<UnboundedReceiver<()>>>,
}

impl SyncService {
    pub fn new(
        connection: Arc<JsonConnection>,
        remote: Arc<dyn RemoteBlobChannel>,
        state: StateCache,
        config: SyncConfig,
    ) -> Self {
        let (tx, rx) = unbounded_channel();
        let linked = config.access_token.is_some();
        Self {
            inner: Arc::new(SyncInner {
                config,
                connection,
                remote,
                state,
                status: StdRwLock::new(SyncStatus::Idle),
                linked: AtomicBool::new(linked),
                pull_gate: tokio::sync::Mutex::new(()),
                changes_tx: tx,
                changes_rx: StdMutex::new(Some(rx)),
            }),
        }
    }

    /// The signal mutation services fire after every local write.
    pub fn change_signal(&self) -> ChangeSignal {
        ChangeSignal::new(self.inner.changes_tx.clone())
    }

    pub fn status(&self) -> SyncStatus {
        *self.inner.status.read().expect("status lock poisoned")
    }

    pub fn is_linked(&self) -> bool {
        self.inner.linked.load(Ordering::SeqCst)
    }

    /// Spawn the debounced push worker. Must run inside a tokio runtime.
    ///
    /// The worker implements cancel-and-reschedule debouncing: every change
    /// signal moves the upload deadline out by the configured window, so a
    /// burst of edits produces exactly one upload of the final state.
    pub fn start(&self) {
        let mut rx = match self.inner.changes_rx.lock().expect("rx lock poisoned").take() {
            Some(rx) => rx,
            None => {
                warn!("Sync push worker already started");
                return;
            }
        };

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let window = Duration::from_millis(inner.config.debounce_ms);
            let mut deadline: Option<Instant> = None;
            loop {
                match deadline {
                    Some(when) => tokio::select! {
                        changed = rx.recv() => match changed {
                            Some(()) => deadline = Some(Instant::now() + window),
                            None => break,
                        },
                        _ = sleep_until(when) => {
                            deadline = None;
                            if inner.is_linked() {
                                inner.push_snapshot().await;
                            }
                        }
                    },
                    None => match rx.recv().await {
                        Some(()) => {
                            if inner.is_linked() {
                                deadline = Some(Instant::now() + window);
                            }
                        }
                        None => break,
                    },
                }
            }
            debug!("Sync push worker stopped");
        });
    }

    /// Mark the remote as linked and pull immediately.
    pub async fn link_remote(&self) {
        self.inner.linked.store(true, Ordering::SeqCst);
        let _ = self.sync_with_remote().await;
    }

    /// The app regained foreground visibility; refresh from the cloud so
    /// edits made on another device show up without polling.
    pub async fn handle_app_foreground(&self) {
        let _ = self.sync_with_remote().await;
    }

    /// Manual retry entry point for the status indicator.
    pub async fn retry_sync(&self) {
        let _ = self.sync_with_remote().await;
    }

    /// Run one pull-merge-persist cycle.
    ///
    /// No-ops when the remote is not linked (the feature is opt-in) or when
    /// a cycle is already in flight. Any failure flips the status to
    /// [`SyncStatus::Error`] and leaves the local store untouched.
    pub async fn sync_with_remote(&self) -> Result<(), SyncError> {
        if !self.is_linked() {
            debug!("Remote not linked; skipping sync");
            return Ok(());
        }
        let _guard = match self.inner.pull_gate.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                debug!("Sync already in flight; skipping overlapping trigger");
                return Ok(());
            }
        };

        self.inner.set_status(SyncStatus::Syncing);
        match self.inner.pull_merge_persist().await {
            Ok(()) => {
                self.inner.set_status(SyncStatus::Idle);
                Ok(())
            }
            Err(e) => {
                error!("Cloud sync failed: {}", e);
                self.inner.set_status(SyncStatus::Error);
                Err(e)
            }
        }
    }
}

impl SyncInner {
    fn set_status(&self, status: SyncStatus) {
        *self.status.write().expect("status lock poisoned") = status;
    }

    fn is_linked(&self) -> bool {
        self.linked.load(Ordering::SeqCst)
    }

    async fn pull_merge_persist(&self) -> Result<(), SyncError> {
        let file_id = self
            .remote
            .resolve_or_create_file(&self.config.snapshot_file_name)
            .await?;

        let bytes = match self.remote.read_file(&file_id).await? {
            Some(bytes) => bytes,
            None => {
                info!("Remote snapshot is empty; nothing to merge yet");
                return Ok(());
            }
        };
        let remote_snapshot: Snapshot = serde_json::from_slice(&bytes)?;

        let local = self.connection.load_all().map_err(SyncError::Store)?;

        let mut merged = AppData {
            logs: merge(&local.logs, &remote_snapshot.logs),
            children: merge(&local.children, &remote_snapshot.children),
            appointments: merge_appointments(&local.appointments, &remote_snapshot.appointments),
            caregivers: merge(&local.caregivers, &remote_snapshot.caregivers),
            join_requests: merge(&local.join_requests, &remote_snapshot.join_requests),
        };
        // A vaccine log arriving from the other device completes the
        // matching appointment, exactly as a local logging would.
        merged.appointments = clear_completed_vaccines(&merged.logs, merged.appointments);

        // The transaction boundary: either all five collections are
        // replaced or none are.
        self.connection.replace_all(&merged).map_err(SyncError::Store)?;

        *self.state.write().expect("state cache poisoned") = merged;

        // Republish the reconciled state: where local records won the
        // merge, the remote still holds the superseded versions until the
        // next upload, so a pull schedules a push like any other change.
        let _ = self.changes_tx.send(());
        info!("Bidirectional sync merge complete");
        Ok(())
    }

    /// Upload the current in-memory snapshot wholesale.
    async fn push_snapshot(&self) {
        self.set_status(SyncStatus::Syncing);
        match self.try_push().await {
            Ok(()) => {
                self.set_status(SyncStatus::Idle);
                info!("Cloud backup complete");
            }
            Err(e) => {
                error!("Snapshot upload failed: {}", e);
                self.set_status(SyncStatus::Error);
            }
        }
    }

    async fn try_push(&self) -> Result<(), SyncError> {
        let file_id = self
            .remote
            .resolve_or_create_file(&self.config.snapshot_file_name)
            .await?;
        let snapshot = {
            let state = self.state.read().expect("state cache poisoned");
            state.to_snapshot(Utc::now().timestamp_millis())
        };
        let bytes = serde_json::to_vec(&snapshot)?;
        self.remote.write_file(&file_id, bytes).await
    }
}
