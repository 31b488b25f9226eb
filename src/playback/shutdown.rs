//! Completion/shutdown tracking
//!
//! Lets a caller block until a dynamically-sized set of in-flight operations
//! has fully drained, without knowing in advance how many there will be.
//! Each operation holds a [`ShutdownGuard`]; the tracker's receiver observes
//! channel closure the instant the last guard (and the tracker's own root
//! sender) is dropped, so the idle signal fires exactly once regardless of
//! drop order across threads.

use tokio::sync::mpsc;
use tracing::debug;

/// Tracks outstanding operations via guard handles
///
/// The tracker is "busy" while any [`ShutdownGuard`] derived from it is
/// alive. No message is ever sent on the internal channel; only its closure
/// carries information.
pub struct ShutdownTracker {
    root: mpsc::Sender<()>,
    done: mpsc::Receiver<()>,
}

/// Marker held by one in-flight operation
///
/// Cloning derives another holder; the tracker stays busy until every clone
/// is dropped.
#[derive(Clone)]
pub struct ShutdownGuard {
    _root: mpsc::Sender<()>,
}

impl ShutdownTracker {
    pub fn new() -> Self {
        let (root, done) = mpsc::channel(1);
        Self { root, done }
    }

    /// Derive a guard for one in-flight operation
    pub fn guard(&self) -> ShutdownGuard {
        ShutdownGuard {
            _root: self.root.clone(),
        }
    }

    /// Wait until every guard has been dropped
    ///
    /// Releases the tracker's own root holder first, so the caller can never
    /// be the reason completion is unreachable, then blocks until the
    /// busy-to-idle transition.
    pub async fn wait_complete(mut self) {
        drop(self.root);
        // recv() yields None exactly once, when the last sender clone is gone
        while self.done.recv().await.is_some() {}
        debug!("Shutdown tracker drained");
    }
}

impl Default for ShutdownTracker {
    fn default() -> Self {
        Self::new()
    }
}
