//! Sync orchestrator - one run of the discovery and sync pipeline
//!
//! ```text
//! idle → discovering → diffing → batching → concluded
//!             │           │          │
//!             └───────────┴──────────┴────→ error
//! ```
//!
//! Missing entries are processed in sequential batches; inside a batch at
//! most `concurrency` entries are in flight. Per-entry failures become
//! counters. Only discovery, diff, and setup failures fail the run.

use crate::catalog::{missing_entries, CatalogEntry};
use crate::config::{Config, SyncConfig};
use crate::cover::CoverLookup;
use crate::crawler::{parse_page_meta, Crawler, Fetcher, PageMeta};
use crate::extract::{Extraction, ExtractionEngine};
use crate::state::{SyncPhase, SyncStatus};
use crate::storage::{AccountStatus, CatalogStore, NewGame, StorageError};
use crate::sync::progress::{EntryOutcome, ProgressTracker, SyncProgress};
use crate::sync::SyncMode;
use crate::SyncError;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Final figures of a sync run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncReport {
    pub run_id: u64,
    pub mode: SyncMode,
    pub status: SyncStatus,
    pub entries_found: u64,
    pub missing: u64,
    pub added: u64,
    pub updated_existing: u64,
    pub credentials_added: u64,
    pub failed: u64,
    pub message: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl SyncReport {
    pub fn from_progress(progress: &SyncProgress) -> Self {
        Self {
            run_id: progress.run_id,
            mode: progress.mode,
            status: progress.status(),
            entries_found: progress.entries_found,
            missing: progress.total_entries,
            added: progress.added,
            updated_existing: progress.updated_existing,
            credentials_added: progress.credentials_added,
            failed: progress.failed,
            message: progress.message.clone(),
            started_at: progress.started_at,
            finished_at: progress.finished_at,
        }
    }
}

/// Why a single entry could not be synced
#[derive(Debug)]
enum EntryFailure {
    Fetch(crate::crawler::FetchError),
    Store(StorageError),
}

impl EntryFailure {
    fn reason(&self) -> String {
        match self {
            Self::Fetch(e) => e.kind().to_string(),
            Self::Store(e) => e.to_string(),
        }
    }
}

impl From<StorageError> for EntryFailure {
    fn from(err: StorageError) -> Self {
        Self::Store(err)
    }
}

/// Runs sync passes against one origin and one store
pub struct SyncOrchestrator {
    sync_config: SyncConfig,
    crawler: Crawler,
    fetcher: Arc<Fetcher>,
    engine: ExtractionEngine,
    store: Arc<dyn CatalogStore>,
    covers: Arc<dyn CoverLookup>,
    progress: ProgressTracker,
    last_run_id: AtomicU64,
}

impl SyncOrchestrator {
    /// Builds the orchestrator and its collaborators from configuration
    pub fn new(
        config: &Config,
        store: Arc<dyn CatalogStore>,
        covers: Arc<dyn CoverLookup>,
    ) -> Result<Self, SyncError> {
        let fetcher = Arc::new(Fetcher::new(config.fetcher.clone())?);
        let crawler = Crawler::new(config, Arc::clone(&fetcher))?;
        let engine = ExtractionEngine::new(&config.extraction)?;

        Ok(Self {
            sync_config: config.sync.clone(),
            crawler,
            fetcher,
            engine,
            store,
            covers,
            progress: ProgressTracker::new(config.sync.recent_titles),
            last_run_id: AtomicU64::new(0),
        })
    }

    /// Handle to this orchestrator's progress
    pub fn progress(&self) -> ProgressTracker {
        self.progress.clone()
    }

    /// Reserves the id of the next run; ids only grow
    pub fn allocate_run_id(&self) -> u64 {
        self.last_run_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Runs one sync with a fresh run id
    pub async fn run_sync(
        &self,
        mode: SyncMode,
        cancel: &CancellationToken,
    ) -> Result<SyncReport, SyncError> {
        let run_id = self.allocate_run_id();
        self.run(run_id, mode, cancel).await
    }

    /// Runs one sync under `run_id`
    ///
    /// On a run-level failure the progress moves to `error` with the failure
    /// message, and the error is returned.
    pub async fn run(
        &self,
        run_id: u64,
        mode: SyncMode,
        cancel: &CancellationToken,
    ) -> Result<SyncReport, SyncError> {
        if !self.progress.begin(run_id, mode) {
            return Err(SyncError::AlreadyRunning);
        }
        tracing::info!("Sync run {} started in {} mode", run_id, mode);

        match self.execute(mode, cancel).await {
            Ok(()) => {
                let report = self.report();
                tracing::info!(
                    "Sync run {} concluded: {} found, {} added, {} existing, {} credentials, {} failed",
                    run_id,
                    report.entries_found,
                    report.added,
                    report.updated_existing,
                    report.credentials_added,
                    report.failed
                );
                Ok(report)
            }
            Err(e) => {
                tracing::error!("Sync run {} failed: {}", run_id, e);
                self.progress.fail(e.to_string());
                Err(e)
            }
        }
    }

    fn report(&self) -> SyncReport {
        self.progress
            .current()
            .map(|p| SyncReport::from_progress(&p))
            .unwrap_or_else(|| SyncReport {
                run_id: 0,
                mode: SyncMode::Full,
                status: SyncStatus::Error,
                entries_found: 0,
                missing: 0,
                added: 0,
                updated_existing: 0,
                credentials_added: 0,
                failed: 0,
                message: String::new(),
                started_at: Utc::now(),
                finished_at: None,
            })
    }

    async fn execute(&self, mode: SyncMode, cancel: &CancellationToken) -> Result<(), SyncError> {
        self.progress.transition(SyncPhase::Discovering)?;
        self.progress.set_message("discovering catalog entries");

        let membership = self.store.list_normalized_titles()?;
        tracing::debug!("Store holds {} titles", membership.len());

        let discovered = match mode {
            SyncMode::Full => self.crawler.discover_all().await?,
            SyncMode::Fast => {
                let front = self.crawler.discover_front_page().await?;
                let front_count = front.len() as u64;
                if missing_entries(front, &membership).is_empty() {
                    self.progress.set_entries_found(front_count);
                    tracing::info!("Front page shows no new titles; skipping full discovery");
                    return self.progress.conclude("no new titles on the front page");
                }
                tracing::info!("Front page shows new titles; running full discovery");
                self.crawler.discover_all().await?
            }
        };

        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        self.progress.transition(SyncPhase::Diffing)?;
        self.progress.set_entries_found(discovered.len() as u64);
        let missing = missing_entries(discovered, &membership);
        tracing::info!("{} entries missing from the store", missing.len());

        if missing.is_empty() {
            return self.progress.conclude("store is up to date");
        }

        self.progress.transition(SyncPhase::Batching)?;
        self.process_batches(&missing, cancel).await?;

        self.progress.conclude("sync concluded")
    }

    async fn process_batches(
        &self,
        missing: &[CatalogEntry],
        cancel: &CancellationToken,
    ) -> Result<(), SyncError> {
        let batch_size = self.sync_config.batch_size.max(1);
        let concurrency = self.sync_config.concurrency.max(1);
        let total_batches = missing.len().div_ceil(batch_size) as u64;

        self.progress.set_totals(missing.len() as u64, total_batches);
        self.progress
            .set_message(format!("processing {} entries", missing.len()));

        for (index, batch) in missing.chunks(batch_size).enumerate() {
            if index > 0 && !pause(self.sync_config.batch_delay_ms, cancel).await {
                return Err(SyncError::Cancelled);
            }
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }

            let batch_number = index as u64 + 1;
            self.progress.set_batch(batch_number);
            tracing::info!(
                "Batch {}/{} ({} entries)",
                batch_number,
                total_batches,
                batch.len()
            );

            let work: Vec<_> = batch
                .iter()
                .enumerate()
                .map(|(position, entry)| self.process_paced(entry, position, cancel))
                .collect();

            stream::iter(work)
                .buffer_unordered(concurrency)
                .collect::<Vec<()>>()
                .await;

            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }
        }

        Ok(())
    }

    /// Waits the entry delay, then processes and records one entry
    async fn process_paced(&self, entry: &CatalogEntry, position: usize, cancel: &CancellationToken) {
        if position > 0 && !pause(self.sync_config.entry_delay_ms, cancel).await {
            return;
        }
        if cancel.is_cancelled() {
            return;
        }

        let outcome = self.process_entry(entry).await;
        self.progress.record_entry(&outcome);
    }

    /// Fetch → extract → upsert for one entry; never fails the run
    async fn process_entry(&self, entry: &CatalogEntry) -> EntryOutcome {
        match self.sync_entry(entry).await {
            Ok(outcome) => outcome,
            Err(failure) => {
                tracing::warn!("Entry {:?} skipped: {}", entry.title, failure.reason());
                EntryOutcome::Failed {
                    title: entry.title.clone(),
                    reason: failure.reason(),
                }
            }
        }
    }

    async fn sync_entry(&self, entry: &CatalogEntry) -> Result<EntryOutcome, EntryFailure> {
        let page = self
            .fetcher
            .fetch(&entry.source_url)
            .await
            .map_err(EntryFailure::Fetch)?;

        let (meta, extraction) = inspect_entry_page(&page.body, &self.engine);
        let entry = CatalogEntry {
            raw_page_title: meta.title,
            raw_heading: meta.heading,
            ..entry.clone()
        };
        tracing::debug!(
            "Entry {:?} ({:?}): {} pairs, {} unpaired",
            entry.title,
            entry.raw_heading,
            extraction.credentials.len(),
            extraction.unpaired_usernames.len()
        );

        let (game_id, inserted) = match self.store.find_game_by_normalized_title(&entry.key())? {
            Some(game) => (game.id, false),
            None => {
                let cover_url = self.covers.lookup_cover(&entry.title).await;
                let outcome = self.store.insert_game(&NewGame {
                    title: entry.title.clone(),
                    description: meta.description,
                    price: None,
                    cover_url,
                    source_url: Some(entry.source_url.clone()),
                })?;
                (outcome.id(), outcome.is_inserted())
            }
        };

        let credentials = self.store_accounts(game_id, &extraction)?;

        Ok(if inserted {
            EntryOutcome::Added {
                title: entry.title,
                credentials,
            }
        } else {
            EntryOutcome::Existing {
                title: entry.title,
                credentials,
            }
        })
    }

    /// Inserts accounts the game does not have yet, returning how many were new
    fn store_accounts(&self, game_id: i64, extraction: &Extraction) -> Result<u64, StorageError> {
        let existing = self.store.list_account_usernames(game_id)?;
        let mut added = 0;

        let complete = extraction
            .credentials
            .iter()
            .map(|c| (c.username.as_str(), c.password.as_str(), AccountStatus::Active));
        let incomplete = extraction
            .unpaired_usernames
            .iter()
            .map(|u| (u.as_str(), "", AccountStatus::Incomplete));

        for (username, password, status) in complete.chain(incomplete) {
            if existing.contains(&username.to_lowercase()) {
                continue;
            }
            if self
                .store
                .insert_account(game_id, username, password, status)?
                .is_inserted()
            {
                added += 1;
            }
        }

        Ok(added)
    }
}

/// Parses an entry page once for its metadata and credentials
fn inspect_entry_page(body: &str, engine: &ExtractionEngine) -> (PageMeta, Extraction) {
    let meta = parse_page_meta(body);
    let extraction = engine.extract(body);
    (meta, extraction)
}

/// Sleeps unless cancelled first; returns false on cancellation
async fn pause(ms: u64, cancel: &CancellationToken) -> bool {
    if ms == 0 {
        return !cancel.is_cancelled();
    }
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(Duration::from_millis(ms)) => true,
    }
}
