//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `TaskState`: The lifecycle of a single URL task (queued, fetching, then one terminal outcome)
//! - `TaskLedger`: Per-run record of every task's state with validated transitions

mod ledger;
mod task_state;

// Re-export main types
pub use ledger::TaskLedger;
pub use task_state::TaskState;
