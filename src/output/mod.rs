//! Output module for reporting on the catalog store
//!
//! This module handles:
//! - Store statistics for the CLI
//! - The sync run history

pub mod stats;

pub use stats::{format_run, load_statistics, print_history, print_statistics, SyncStatistics};
