//! # Baby Tracker Backend
//!
//! Offline-first core of the baby activity tracker: an in-memory state
//! cache backed by a JSON-file record store, a family of mutation
//! services, and a cloud sync engine that merges bidirectionally with a
//! remote snapshot and uploads on a debounce after local changes.

pub mod config;
pub mod domain;
pub mod state;
pub mod storage;
pub mod sync;

use std::sync::Arc;

use anyhow::Result;
use log::{info, warn};
use tokio::time::Duration;

use config::AppConfig;
use domain::{ActivityService, AppointmentService, ChildService, FamilyService};
use state::{new_state_cache, AppData, StateCache};
use storage::json::{
    AppointmentRepository, CaregiverRepository, ChildRepository, JoinRequestRepository,
    LogRepository,
};
use storage::legacy::load_legacy_backup;
use storage::JsonConnection;
use sync::{HttpBlobStore, RemoteBlobChannel, SyncService};

/// The assembled application core.
///
/// Owns the shared state cache and wires the mutation services to the
/// record store and the sync engine. Construction loads the store (with a
/// bounded wait and a legacy-backup fallback) and starts the debounced
/// upload worker, so it must run inside a tokio runtime.
pub struct Backend {
    state: StateCache,
    pub activity_service: ActivityService,
    pub child_service: ChildService,
    pub appointment_service: AppointmentService,
    pub family_service: FamilyService,
    pub sync_service: SyncService,
}

impl Backend {
    pub async fn new(config: AppConfig) -> Result<Self> {
        let remote: Arc<dyn RemoteBlobChannel> = Arc::new(HttpBlobStore::new(
            config.sync.api_base_url.clone(),
            config.sync.upload_base_url.clone(),
            config.sync.access_token.clone().unwrap_or_default(),
        ));
        Self::with_remote(config, remote).await
    }

    /// Assemble the core against an injected remote channel.
    pub async fn with_remote(
        config: AppConfig,
        remote: Arc<dyn RemoteBlobChannel>,
    ) -> Result<Self> {
        let connection = Arc::new(JsonConnection::new(&config.data_dir)?);
        let initial = load_initial_data(&config, connection.clone()).await;

        let state = new_state_cache();
        *state.write().expect("state cache poisoned") = initial;

        let sync_service =
            SyncService::new(connection.clone(), remote, state.clone(), config.sync.clone());
        sync_service.start();
        if sync_service.is_linked() {
            // Already linked at construction: pull right away so edits
            // made on another device show up without waiting for a
            // foreground trigger.
            let startup_sync = sync_service.clone();
            tokio::spawn(async move {
                let _ = startup_sync.sync_with_remote().await;
            });
        }
        let changes = sync_service.change_signal();

        let log_store = Arc::new(LogRepository::new(connection.clone()));
        let child_store = Arc::new(ChildRepository::new(connection.clone()));
        let appointment_store = Arc::new(AppointmentRepository::new(connection.clone()));
        let caregiver_store = Arc::new(CaregiverRepository::new(connection.clone()));
        let join_request_store = Arc::new(JoinRequestRepository::new(connection));

        Ok(Self {
            activity_service: ActivityService::new(
                log_store.clone(),
                child_store.clone(),
                appointment_store.clone(),
                state.clone(),
                changes.clone(),
            ),
            child_service: ChildService::new(
                child_store.clone(),
                log_store,
                appointment_store.clone(),
                state.clone(),
                changes.clone(),
            ),
            appointment_service: AppointmentService::new(
                appointment_store,
                child_store,
                state.clone(),
                changes.clone(),
            ),
            family_service: FamilyService::new(
                caregiver_store,
                join_request_store,
                state.clone(),
                changes,
            ),
            sync_service,
            state,
        })
    }

    /// Read-only view of the current in-memory collections.
    pub fn current_data(&self) -> AppData {
        self.state.read().expect("state cache poisoned").clone()
    }
}

/// Load the record store with a bounded wait. An unreadable, timed-out or
/// empty store falls back to the legacy single-file backup when one is
/// configured; the recovered records are written through so the next
/// start reads them from the store directly.
async fn load_initial_data(config: &AppConfig, connection: Arc<JsonConnection>) -> AppData {
    let timeout = Duration::from_millis(config.sync.startup_load_timeout_ms);
    let load_connection = connection.clone();
    let load = tokio::task::spawn_blocking(move || load_connection.load_all());

    let loaded = match tokio::time::timeout(timeout, load).await {
        Ok(Ok(Ok(data))) => Some(data),
        Ok(Ok(Err(e))) => {
            warn!("Record store failed to load: {:#}", e);
            None
        }
        Ok(Err(e)) => {
            warn!("Record store load task panicked: {}", e);
            None
        }
        Err(_) => {
            warn!("Record store load timed out after {}ms", config.sync.startup_load_timeout_ms);
            None
        }
    };

    let store_usable = matches!(&loaded, Some(data) if !data.is_empty());
    if !store_usable {
        if let Some(path) = &config.legacy_backup {
            let legacy = load_legacy_backup(path);
            if !legacy.is_empty() {
                info!("Recovered {} child(ren) from legacy backup", legacy.children.len());
                if let Err(e) = connection.replace_all(&legacy) {
                    warn!("Failed to persist recovered legacy data: {:#}", e);
                }
                return legacy;
            }
        }
    }

    loaded.unwrap_or_default()
}
