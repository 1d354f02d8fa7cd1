use std::sync::Arc;
use tokio::sync::watch;

/// Cooperative cancellation signal shared by the coordinator and its workers
///
/// Triggered by Ctrl-C or the run timeout. Once cancelled, no new tasks are
/// dispatched and retry backoffs end early; in-flight fetches run to
/// completion under their own timeouts.
#[derive(Debug, Clone)]
pub struct Shutdown {
    sender: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Triggers cancellation; repeated calls are no-ops
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    /// Resolves once cancellation has been triggered
    pub async fn cancelled(&self) {
        let mut receiver = self.sender.subscribe();
        // The sender lives as long as self, so wait_for cannot fail here
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
