//! Cloud synchronization: the merge engine, the remote blob channel, and
//! the orchestrator that sequences download, merge, persist and the
//! debounced upload.

pub mod merge;
pub mod remote;
pub mod service;

pub use remote::{HttpBlobStore, RemoteBlobChannel};
pub use service::SyncService;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

/// Sync state surfaced to the presentation layer.
///
/// `Error` is sticky until the next successful cycle; it is cleared by a
/// manual retry or the next change-triggered upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Idle,
    Syncing,
    Error,
}

/// Failures crossing the sync boundary.
///
/// None of these escape to the presentation layer as panics or raw errors;
/// the orchestrator converts them into [`SyncStatus::Error`] and logs the
/// detail.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("remote protocol error: {0}")]
    Protocol(String),

    #[error("malformed remote snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("local store error: {0}")]
    Store(#[source] anyhow::Error),
}

/// Cheap cloneable handle the mutation services use to signal "something
/// changed locally". Each signal resets the upload debounce timer.
#[derive(Debug, Clone)]
pub struct ChangeSignal {
    tx: Option<UnboundedSender<()>>,
}

impl ChangeSignal {
    pub(crate) fn new(tx: UnboundedSender<()>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A signal wired to nothing, for tests and sync-disabled setups.
    pub fn disconnected() -> Self {
        Self { tx: None }
    }

    pub fn notify(&self) {
        if let Some(tx) = &self.tx {
            // The receiver going away just means sync shut down.
            let _ = tx.send(());
        }
    }
}
