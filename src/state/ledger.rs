use super::TaskState;
use crate::CrawlerError;
use std::collections::HashMap;

/// Records the state of every task created during a run
///
/// Keys are normalized URL strings. The ledger rejects any transition the
/// state machine does not allow, so a task can reach a terminal state once.
#[derive(Debug, Default)]
pub struct TaskLedger {
    states: HashMap<String, TaskState>,
}

impl TaskLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a newly created task in the `Queued` state
    ///
    /// Returns false if the URL was already registered.
    pub fn enqueue(&mut self, url: &str) -> bool {
        if self.states.contains_key(url) {
            return false;
        }
        self.states.insert(url.to_string(), TaskState::Queued);
        true
    }

    /// Moves a task to `next`, validating the transition
    pub fn transition(&mut self, url: &str, next: TaskState) -> crate::Result<()> {
        let current = self
            .states
            .get_mut(url)
            .ok_or_else(|| CrawlerError::InvalidTransition {
                url: url.to_string(),
                from: TaskState::Queued,
                to: next,
            })?;

        if !current.can_transition_to(next) {
            return Err(CrawlerError::InvalidTransition {
                url: url.to_string(),
                from: *current,
                to: next,
            });
        }

        *current = next;
        Ok(())
    }

    pub fn state_of(&self, url: &str) -> Option<TaskState> {
        self.states.get(url).copied()
    }

    /// Registers a task finished by an earlier run directly in `state`
    ///
    /// Returns false if the URL was already registered.
    pub fn restore(&mut self, url: &str, state: TaskState) -> bool {
        if self.states.contains_key(url) {
            return false;
        }
        self.states.insert(url.to_string(), state);
        true
    }

    /// URLs currently in `state`, sorted
    pub fn urls_in(&self, state: TaskState) -> Vec<String> {
        let mut urls: Vec<String> = self
            .states
            .iter()
            .filter(|(_, s)| **s == state)
            .map(|(url, _)| url.clone())
            .collect();
        urls.sort();
        urls
    }

    /// Total number of tasks ever registered
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
