//! Statistics generation from the catalog store
//!
//! This module provides functionality for extracting and displaying store
//! statistics and the sync run history.

use crate::storage::{CatalogStore, StoreCounts, SyncRunRecord};
use crate::SyncError;

/// Store statistics summary
#[derive(Debug, Clone)]
pub struct SyncStatistics {
    /// Row counts of the store
    pub counts: StoreCounts,

    /// Most recent sync runs, newest first
    pub recent_runs: Vec<SyncRunRecord>,
}

/// Loads statistics from the store
///
/// # Arguments
///
/// * `store` - The store to query
/// * `recent` - How many recent sync runs to include
pub fn load_statistics(store: &dyn CatalogStore, recent: usize) -> Result<SyncStatistics, SyncError> {
    let counts = store.counts()?;
    let recent_runs = store.list_sync_runs(recent)?;

    Ok(SyncStatistics {
        counts,
        recent_runs,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &SyncStatistics) {
    println!("=== Catalog Statistics ===\n");

    let counts = &stats.counts;
    println!("Overview:");
    println!("  Games: {}", counts.games);
    println!("  Accounts: {}", counts.accounts);
    let incomplete_share = if counts.accounts > 0 {
        (counts.incomplete_accounts as f64 / counts.accounts as f64) * 100.0
    } else {
        0.0
    };
    println!(
        "  Incomplete accounts: {} ({:.1}%)",
        counts.incomplete_accounts, incomplete_share
    );
    println!("  Sync runs: {}", counts.sync_runs);
    println!();

    if !stats.recent_runs.is_empty() {
        println!("Recent Runs:");
        print_history(&stats.recent_runs);
    }
}

/// Prints one line per audit row
pub fn print_history(runs: &[SyncRunRecord]) {
    for run in runs {
        println!("  {}", format_run(run));
    }
}

/// One-line rendering of an audit row
pub fn format_run(run: &SyncRunRecord) -> String {
    let s = &run.summary;
    format!(
        "#{} [{}] {} {}: found {}, added {}, existing {}, credentials {}, failed {} ({})",
        run.id,
        s.started_at,
        s.mode,
        s.status,
        s.entries_found,
        s.added,
        s.updated_existing,
        s.credentials_added,
        s.failed,
        s.message
    )
}
