//! Sync progress tracking
//!
//! One `ProgressTracker` is owned per orchestrator and shared (by cloning the
//! handle) with whoever polls progress. Every mutation happens under a single
//! lock acquisition, so concurrent entry workers never race on counters.

use crate::state::{SyncPhase, SyncStatus};
use crate::sync::SyncMode;
use crate::SyncError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

/// Result of processing one missing entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOutcome {
    /// A new game was inserted
    Added { title: String, credentials: u64 },
    /// The game already existed; only new accounts were added
    Existing { title: String, credentials: u64 },
    /// The entry was skipped (fetch exhausted or store failure)
    Failed { title: String, reason: String },
}

/// Live state of one sync run
#[derive(Debug, Clone)]
pub struct SyncProgress {
    pub run_id: u64,
    pub mode: SyncMode,
    pub phase: SyncPhase,
    /// Entries discovered on the origin, before the diff
    pub entries_found: u64,
    pub total_entries: u64,
    pub processed: u64,
    pub added: u64,
    pub updated_existing: u64,
    pub credentials_added: u64,
    pub failed: u64,
    pub current_batch: u64,
    pub total_batches: u64,
    pub message: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Most recently added titles, newest last
    pub recent_titles: VecDeque<String>,
    recent_capacity: usize,
}

impl SyncProgress {
    fn new(run_id: u64, mode: SyncMode, recent_capacity: usize) -> Self {
        Self {
            run_id,
            mode,
            phase: SyncPhase::Idle,
            entries_found: 0,
            total_entries: 0,
            processed: 0,
            added: 0,
            updated_existing: 0,
            credentials_added: 0,
            failed: 0,
            current_batch: 0,
            total_batches: 0,
            message: String::new(),
            started_at: Utc::now(),
            finished_at: None,
            recent_titles: VecDeque::with_capacity(recent_capacity),
            recent_capacity: recent_capacity.max(1),
        }
    }

    pub fn status(&self) -> SyncStatus {
        SyncStatus::from(self.phase)
    }

    fn apply(&mut self, outcome: &EntryOutcome) {
        self.processed += 1;

        match outcome {
            EntryOutcome::Added { title, credentials } => {
                self.added += 1;
                self.credentials_added += credentials;
                self.push_recent(title);
            }
            EntryOutcome::Existing { credentials, .. } => {
                self.updated_existing += 1;
                self.credentials_added += credentials;
            }
            EntryOutcome::Failed { .. } => {
                self.failed += 1;
            }
        }
    }

    fn push_recent(&mut self, title: &str) {
        if self.recent_titles.len() == self.recent_capacity {
            self.recent_titles.pop_front();
        }
        self.recent_titles.push_back(title.to_string());
    }
}

/// Point-in-time view served to progress consumers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    pub active: bool,
    pub run_id: Option<u64>,
    pub mode: Option<SyncMode>,
    pub phase: SyncPhase,
    pub status: Option<SyncStatus>,
    pub percent: f64,
    pub entries_found: u64,
    pub processed: u64,
    pub total: u64,
    pub remaining: u64,
    pub added: u64,
    pub updated_existing: u64,
    pub credentials_added: u64,
    pub failed: u64,
    pub current_batch: u64,
    pub total_batches: u64,
    pub message: String,
    pub recent_titles: Vec<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ProgressSnapshot {
    /// Snapshot when no run is tracked
    pub fn idle() -> Self {
        Self {
            active: false,
            run_id: None,
            mode: None,
            phase: SyncPhase::Idle,
            status: None,
            percent: 0.0,
            entries_found: 0,
            processed: 0,
            total: 0,
            remaining: 0,
            added: 0,
            updated_existing: 0,
            credentials_added: 0,
            failed: 0,
            current_batch: 0,
            total_batches: 0,
            message: String::new(),
            recent_titles: Vec::new(),
            started_at: None,
            finished_at: None,
        }
    }

    /// Builds a snapshot from live progress
    ///
    /// A concluded run always reports 100% and nothing remaining, whatever
    /// the raw counters say.
    pub fn from_progress(progress: &SyncProgress) -> Self {
        let status = progress.status();
        let total = progress.total_entries;
        let processed = progress.processed;

        let (percent, remaining) = if status == SyncStatus::Concluded {
            (100.0, 0)
        } else if total == 0 {
            (0.0, 0)
        } else {
            let ratio = processed.min(total) as f64 / total as f64;
            ((ratio * 1000.0).round() / 10.0, total.saturating_sub(processed))
        };

        Self {
            active: status == SyncStatus::Processing,
            run_id: Some(progress.run_id),
            mode: Some(progress.mode),
            phase: progress.phase,
            status: Some(status),
            percent,
            entries_found: progress.entries_found,
            processed,
            total,
            remaining,
            added: progress.added,
            updated_existing: progress.updated_existing,
            credentials_added: progress.credentials_added,
            failed: progress.failed,
            current_batch: progress.current_batch,
            total_batches: progress.total_batches,
            message: progress.message.clone(),
            recent_titles: progress.recent_titles.iter().cloned().collect(),
            started_at: Some(progress.started_at),
            finished_at: progress.finished_at,
        }
    }
}

/// Shared handle to the progress of the current (or last) run
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    inner: Arc<Mutex<Option<SyncProgress>>>,
    recent_capacity: usize,
}

impl ProgressTracker {
    pub fn new(recent_capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(None)),
            recent_capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<SyncProgress>> {
        // Every mutation completes under one acquisition, so a poisoned value is still whole
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Starts tracking a new run, replacing a finished one
    ///
    /// Returns false, changing nothing, while another run is still active.
    pub fn begin(&self, run_id: u64, mode: SyncMode) -> bool {
        let mut guard = self.lock();
        if guard.as_ref().map(|p| !p.phase.is_terminal()).unwrap_or(false) {
            return false;
        }
        *guard = Some(SyncProgress::new(run_id, mode, self.recent_capacity));
        true
    }

    /// Moves the run to `next`, rejecting transitions the state machine forbids
    pub fn transition(&self, next: SyncPhase) -> Result<(), SyncError> {
        let mut guard = self.lock();
        let Some(progress) = guard.as_mut() else {
            return Err(SyncError::InvalidTransition {
                from: SyncPhase::Idle,
                to: next,
            });
        };

        if !progress.phase.can_transition_to(next) {
            return Err(SyncError::InvalidTransition {
                from: progress.phase,
                to: next,
            });
        }

        tracing::debug!("Sync run {}: {} -> {}", progress.run_id, progress.phase, next);
        progress.phase = next;
        if next.is_terminal() {
            progress.finished_at = Some(Utc::now());
        }
        Ok(())
    }

    pub fn set_entries_found(&self, entries_found: u64) {
        if let Some(progress) = self.lock().as_mut() {
            progress.entries_found = entries_found;
        }
    }

    /// Sets totals for the batching phase
    pub fn set_totals(&self, total_entries: u64, total_batches: u64) {
        if let Some(progress) = self.lock().as_mut() {
            progress.total_entries = total_entries;
            progress.total_batches = total_batches;
        }
    }

    pub fn set_batch(&self, batch: u64) {
        if let Some(progress) = self.lock().as_mut() {
            progress.current_batch = batch;
        }
    }

    pub fn set_message(&self, message: impl Into<String>) {
        if let Some(progress) = self.lock().as_mut() {
            progress.message = message.into();
        }
    }

    /// Applies one completed entry as a single mutation
    pub fn record_entry(&self, outcome: &EntryOutcome) {
        if let Some(progress) = self.lock().as_mut() {
            progress.apply(outcome);
        }
    }

    /// Ends the run with `Concluded`
    pub fn conclude(&self, message: impl Into<String>) -> Result<(), SyncError> {
        self.set_message(message);
        self.transition(SyncPhase::Concluded)
    }

    /// Ends the run with `Error`; a run already in a terminal phase is left alone
    pub fn fail(&self, message: impl Into<String>) {
        let mut guard = self.lock();
        if let Some(progress) = guard.as_mut() {
            if progress.phase.is_terminal() {
                return;
            }
            progress.phase = SyncPhase::Error;
            progress.message = message.into();
            progress.finished_at = Some(Utc::now());
        }
    }

    /// Copy of the live progress, if a run is tracked
    pub fn current(&self) -> Option<SyncProgress> {
        self.lock().clone()
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        match self.lock().as_ref() {
            Some(progress) => ProgressSnapshot::from_progress(progress),
            None => ProgressSnapshot::idle(),
        }
    }

    /// Returns true while a run is in a non-terminal phase
    pub fn is_active(&self) -> bool {
        self.lock()
            .as_ref()
            .map(|p| !p.phase.is_terminal())
            .unwrap_or(false)
    }

    /// Forgets the tracked run, but only if it is still `run_id`
    pub fn clear_if_run(&self, run_id: u64) -> bool {
        let mut guard = self.lock();
        match guard.as_ref() {
            Some(progress) if progress.run_id == run_id && progress.phase.is_terminal() => {
                *guard = None;
                true
            }
            _ => false,
        }
    }
}
