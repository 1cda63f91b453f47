/// Phase and status definitions for a sync run
///
/// The phase is the orchestrator's internal position in the run; the status is
/// the coarse value reported to progress consumers and the audit history.
use serde::Serialize;
use std::fmt;

/// Represents the current phase of a sync run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncPhase {
    /// No run has started yet
    Idle,

    /// Walking the origin to collect catalog entries
    Discovering,

    /// Comparing discovered entries against the store
    Diffing,

    /// Processing missing entries in batches
    Batching,

    // ===== Terminal States =====
    /// Run finished normally
    Concluded,

    /// Run aborted with a run-level failure or was cancelled
    Error,
}

impl SyncPhase {
    /// Returns true if no further transitions are allowed
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Concluded | Self::Error)
    }

    /// Checks whether moving from this phase to `next` is allowed
    ///
    /// Every non-terminal phase may fail into `Error`. `Discovering` may
    /// conclude directly (fast-mode short-circuit) and `Diffing` may conclude
    /// when nothing is missing.
    pub fn can_transition_to(&self, next: SyncPhase) -> bool {
        use SyncPhase::*;

        if self.is_terminal() {
            return false;
        }

        match (self, next) {
            (_, Error) => true,
            (Idle, Discovering) => true,
            (Discovering, Diffing) | (Discovering, Concluded) => true,
            (Diffing, Batching) | (Diffing, Concluded) => true,
            (Batching, Concluded) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Discovering => "discovering",
            Self::Diffing => "diffing",
            Self::Batching => "batching",
            Self::Concluded => "concluded",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Externally visible status of a sync run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Processing,
    Concluded,
    Error,
}

impl SyncStatus {
    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Concluded => "concluded",
            Self::Error => "error",
        }
    }

    /// Parses a status from its database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "processing" => Some(Self::Processing),
            "concluded" => Some(Self::Concluded),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

impl From<SyncPhase> for SyncStatus {
    fn from(phase: SyncPhase) -> Self {
        match phase {
            SyncPhase::Concluded => Self::Concluded,
            SyncPhase::Error => Self::Error,
            _ => Self::Processing,
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
