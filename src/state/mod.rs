//! State module for tracking sync progress
//!
//! # Components
//!
//! - `SyncPhase`: the orchestrator's state machine (idle, discovering, diffing, batching, terminal)
//! - `SyncStatus`: the coarse status reported to progress consumers and persisted on audit rows

mod sync_phase;

pub use sync_phase::{SyncPhase, SyncStatus};
