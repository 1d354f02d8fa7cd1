//! Bounded-concurrency worker pool
//!
//! This module handles:
//! - Keeping at most `limit` tasks in flight
//! - Topping up from the queue as soon as a task completes
//! - Feeding completions back to the caller, which may enqueue more work
//! - Stopping dispatch once shutdown is triggered

use crate::crawler::shutdown::Shutdown;
use std::future::Future;
use tokio::task::JoinSet;
use tracing::{debug, error};

/// Source of tasks for the pool
///
/// The pool pulls one task at a time; the completion callback receives the
/// same queue mutably, so completions can add work while the pool runs.
pub trait TaskQueue {
    type Task;

    fn next_task(&mut self) -> Option<Self::Task>;
}

impl<T> TaskQueue for std::collections::VecDeque<T> {
    type Task = T;

    fn next_task(&mut self) -> Option<T> {
        self.pop_front()
    }
}

/// A finished task and what its worker produced
#[derive(Debug)]
pub struct Completion<T, O> {
    pub task: T,
    /// `Err` carries the panic message of a worker that panicked
    pub output: Result<O, String>,
}

/// Counters for one pool run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub dispatched: usize,
    pub completed: usize,
    pub peak_in_flight: usize,
    /// True when dispatch stopped because of shutdown
    pub stopped_early: bool,
}

/// Runs tasks with a fixed upper bound on concurrency
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    limit: usize,
}

impl WorkerPool {
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Drives `queue` to exhaustion
    ///
    /// Every dispatched task is delivered to `on_result` exactly once, in
    /// completion order. A worker that panics is delivered with
    /// `output = Err(message)`. After `shutdown` fires no further tasks are
    /// dispatched, but in-flight tasks are still awaited and delivered.
    pub async fn run_all<Q, W, Fut, F>(
        &self,
        queue: &mut Q,
        shutdown: &Shutdown,
        work: W,
        mut on_result: F,
    ) -> PoolStats
    where
        Q: TaskQueue,
        Q::Task: Clone + Send + 'static,
        W: Fn(Q::Task) -> Fut,
        Fut: Future + Send + 'static,
        Fut::Output: Send + 'static,
        F: FnMut(&mut Q, Completion<Q::Task, Fut::Output>),
    {
        let mut in_flight = JoinSet::new();
        let mut stats = PoolStats::default();

        loop {
            while in_flight.len() < self.limit {
                if shutdown.is_cancelled() {
                    stats.stopped_early = true;
                    break;
                }
                let Some(task) = queue.next_task() else {
                    break;
                };

                // The inner spawn isolates panics so the outer task can
                // still report which task it was running.
                let fut = work(task.clone());
                in_flight.spawn(async move {
                    let output = tokio::spawn(fut).await.map_err(panic_message);
                    (task, output)
                });
                stats.dispatched += 1;
                stats.peak_in_flight = stats.peak_in_flight.max(in_flight.len());
            }

            let Some(joined) = in_flight.join_next().await else {
                break;
            };

            match joined {
                Ok((task, output)) => {
                    stats.completed += 1;
                    on_result(queue, Completion { task, output });
                }
                Err(e) => {
                    // Only reachable if the wrapper itself was aborted
                    error!(error = %e, "Worker wrapper failed");
                }
            }
        }

        debug!(
            dispatched = stats.dispatched,
            completed = stats.completed,
            peak = stats.peak_in_flight,
            "Worker pool drained"
        );
        stats
    }
}

fn panic_message(error: tokio::task::JoinError) -> String {
    if error.is_panic() {
        let payload = error.into_panic();
        if let Some(message) = payload.downcast_ref::<&str>() {
            format!("worker panicked: {}", message)
        } else if let Some(message) = payload.downcast_ref::<String>() {
            format!("worker panicked: {}", message)
        } else {
            "worker panicked".to_string()
        }
    } else {
        format!("worker cancelled: {}", error)
    }
}
