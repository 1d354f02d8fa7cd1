/// Task state definitions for tracking crawl progress
///
/// Every URL task moves `Queued -> Fetching -> {Succeeded, Skipped, Failed}`.
/// The three outcomes are terminal and no task revisits an earlier state.
use std::fmt;

/// Represents the current state of a URL task in the crawl process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    // ===== Active States =====
    /// Task is in the frontier waiting for a worker
    Queued,

    /// Task has been handed to a worker
    Fetching,

    // ===== Terminal States =====
    /// Page was fetched and its content written
    Succeeded,

    /// Page was fetched but its fingerprint matched the cache
    Skipped,

    /// Page failed on every attempt
    Failed,
}

impl TaskState {
    /// Returns true if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Skipped | Self::Failed)
    }

    /// Returns true if the state machine allows moving from `self` to `next`
    pub fn can_transition_to(&self, next: TaskState) -> bool {
        matches!(
            (self, next),
            (Self::Queued, Self::Fetching)
                | (Self::Fetching, Self::Succeeded)
                | (Self::Fetching, Self::Skipped)
                | (Self::Fetching, Self::Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Fetching => "fetching",
            Self::Succeeded => "succeeded",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }

    /// Returns all possible task states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Queued,
            Self::Fetching,
            Self::Succeeded,
            Self::Skipped,
            Self::Failed,
        ]
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
