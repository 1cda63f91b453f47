//! Sync service - the trigger and poll surface around the orchestrator
//!
//! `trigger` starts a run in the background and returns at once. The run is
//! observed through `progress` and, once finished, through the audit rows it
//! leaves in the store.

use crate::state::SyncStatus;
use crate::storage::{CatalogStore, StorageResult, SyncRunRecord, SyncRunSummary};
use crate::sync::orchestrator::{SyncOrchestrator, SyncReport};
use crate::sync::progress::{ProgressSnapshot, ProgressTracker, SyncProgress};
use crate::sync::SyncMode;
use crate::SyncError;
use chrono::Utc;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Acknowledgement returned by `trigger`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerAck {
    pub accepted: bool,
    pub run_id: Option<u64>,
    pub mode: SyncMode,
    pub message: String,
}

struct ActiveRun {
    run_id: u64,
    cancel: CancellationToken,
    handle: JoinHandle<Result<SyncReport, SyncError>>,
}

/// Owns the orchestrator and runs it in the background
pub struct SyncService {
    orchestrator: Arc<SyncOrchestrator>,
    store: Arc<dyn CatalogStore>,
    config_hash: String,
    retention: Duration,
    active: Mutex<Option<ActiveRun>>,
}

impl SyncService {
    pub fn new(
        orchestrator: SyncOrchestrator,
        store: Arc<dyn CatalogStore>,
        config_hash: impl Into<String>,
        retention: Duration,
    ) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            store,
            config_hash: config_hash.into(),
            retention,
            active: Mutex::new(None),
        }
    }

    /// Starts a run in the background
    ///
    /// Returns immediately. A trigger while a run is in flight is refused.
    pub fn trigger(&self, mode: SyncMode) -> TriggerAck {
        let mut active = self.active.lock().unwrap_or_else(|p| p.into_inner());

        if let Some(run) = active.as_ref() {
            if !run.handle.is_finished() {
                return TriggerAck {
                    accepted: false,
                    run_id: Some(run.run_id),
                    mode,
                    message: SyncError::AlreadyRunning.to_string(),
                };
            }
        }

        let run_id = self.orchestrator.allocate_run_id();
        let cancel = CancellationToken::new();

        let orchestrator = Arc::clone(&self.orchestrator);
        let store = Arc::clone(&self.store);
        let config_hash = self.config_hash.clone();
        let retention = self.retention;
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            let result = orchestrator.run(run_id, mode, &token).await;

            let progress = orchestrator.progress();
            if !matches!(result, Err(SyncError::AlreadyRunning)) {
                record_audit(store.as_ref(), &progress, &config_hash);
                schedule_expiry(progress, run_id, retention);
            }

            result
        });

        tracing::info!("Sync run {} triggered ({} mode)", run_id, mode);
        *active = Some(ActiveRun {
            run_id,
            cancel,
            handle,
        });

        TriggerAck {
            accepted: true,
            run_id: Some(run_id),
            mode,
            message: "sync started".to_string(),
        }
    }

    /// Current progress, or an idle snapshot once it has expired
    pub fn progress(&self) -> ProgressSnapshot {
        self.orchestrator.progress().snapshot()
    }

    /// Requests cancellation of the in-flight run, if any
    pub fn cancel(&self) -> bool {
        let active = self.active.lock().unwrap_or_else(|p| p.into_inner());
        match active.as_ref() {
            Some(run) if !run.handle.is_finished() => {
                tracing::info!("Cancelling sync run {}", run.run_id);
                run.cancel.cancel();
                true
            }
            _ => false,
        }
    }

    /// Waits for the most recently triggered run to finish
    ///
    /// Returns None when no run was triggered or it was already awaited.
    pub async fn wait(&self) -> Option<Result<SyncReport, SyncError>> {
        let run = self
            .active
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take()?;

        match run.handle.await {
            Ok(result) => Some(result),
            Err(e) => Some(Err(SyncError::Discovery(format!("sync task aborted: {}", e)))),
        }
    }

    /// Most recent audit rows, newest first
    pub fn history(&self, limit: usize) -> StorageResult<Vec<SyncRunRecord>> {
        self.store.list_sync_runs(limit)
    }
}

/// Builds the audit row for a finished run
pub(crate) fn summary_from_progress(progress: &SyncProgress, config_hash: &str) -> SyncRunSummary {
    SyncRunSummary {
        mode: progress.mode,
        status: progress.status(),
        entries_found: progress.entries_found,
        added: progress.added,
        updated_existing: progress.updated_existing,
        credentials_added: progress.credentials_added,
        failed: progress.failed,
        message: progress.message.clone(),
        config_hash: config_hash.to_string(),
        started_at: progress.started_at.to_rfc3339(),
        finished_at: Some(
            progress
                .finished_at
                .unwrap_or_else(Utc::now)
                .to_rfc3339(),
        ),
    }
}

fn record_audit(store: &dyn CatalogStore, progress: &ProgressTracker, config_hash: &str) {
    let Some(current) = progress.current() else {
        return;
    };

    if current.status() == SyncStatus::Processing {
        tracing::warn!("Sync run {} ended without a terminal status", current.run_id);
    }

    match store.record_sync_run(&summary_from_progress(&current, config_hash)) {
        Ok(id) => tracing::debug!("Recorded sync run {} as audit row {}", current.run_id, id),
        Err(e) => tracing::error!("Failed to record sync run {}: {}", current.run_id, e),
    }
}

/// Clears the finished run's progress after `retention`, unless a newer run replaced it
fn schedule_expiry(progress: ProgressTracker, run_id: u64, retention: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(retention).await;
        if progress.clear_if_run(run_id) {
            tracing::debug!("Progress of sync run {} expired", run_id);
        }
    });
}
