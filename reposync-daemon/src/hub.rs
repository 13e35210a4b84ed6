use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;

use reposync_core::RepoName;

use crate::protocol::RepoEvent;

/// Fan-out of [`RepoEvent`]s to `subscribe` clients.
///
/// The presentation layer counts as visible while at least one receiver is
/// alive. Clones share the channel and the notice counter.
#[derive(Debug, Clone)]
pub struct EventHub {
    tx: broadcast::Sender<RepoEvent>,
    background: Arc<AtomicUsize>,
}

impl EventHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            background: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RepoEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: RepoEvent) {
        // No receivers is the common case.
        let _ = self.tx.send(event);
    }

    pub fn is_visible(&self) -> bool {
        self.tx.receiver_count() > 0
    }

    /// Surface a failed job in the daemon log, unless a subscriber is
    /// watching; subscribers see the `JobFinished` event instead.
    ///
    /// Returns `true` when the background notice was emitted.
    pub fn notify(&self, repo: &RepoName, path: &Path, summary: &str) -> bool {
        if self.is_visible() {
            return false;
        }
        tracing::warn!(repo = %repo, path = %path.display(), "{summary}");
        self.background.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Background notices emitted so far.
    pub fn background_notices(&self) -> usize {
        self.background.load(Ordering::Relaxed)
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new(256)
    }
}
