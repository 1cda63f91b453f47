//! Batch synchronization
//!
//! - `orchestrator`: one sync run, from discovery through batched entry processing
//! - `progress`: the shared progress object and the snapshots served to pollers
//! - `service`: fire-and-forget triggering, audit rows, and progress expiry

mod orchestrator;
mod progress;
mod service;

pub use orchestrator::{SyncOrchestrator, SyncReport};
pub use progress::{EntryOutcome, ProgressSnapshot, ProgressTracker, SyncProgress};
pub use service::{SyncService, TriggerAck};

use serde::Serialize;
use std::fmt;

/// How much of the origin a run inspects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Check the root's first page; crawl everything only if it shows new titles
    Fast,
    /// Always crawl everything
    Full,
}

impl SyncMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Full => "full",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "fast" => Some(Self::Fast),
            "full" => Some(Self::Full),
            _ => None,
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
