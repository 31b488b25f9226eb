//! Session controller
//!
//! Thread-safe facade over one playback state machine. The controller holds
//! only the machine's event sender; the machine itself is owned by its actor
//! task and lives until it reaches `Terminated`, regardless of when the
//! controller is dropped. Every external entry point resolves to a channel
//! send, and a send to a finished session is a silent no-op, so handles
//! remain safely callable after the session is gone.

use crate::config::SessionConfig;
use crate::error::Result;
use crate::playback::backend::PlaybackBackend;
use crate::playback::events::{Mode, SessionEvent, StateSnapshot};
use crate::playback::frame_queue::FrameQueue;
use crate::playback::machine::{ErrorCallback, PlaybackMachine};
use crate::playback::shutdown::ShutdownGuard;
use std::sync::Mutex;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};
use uuid::Uuid;

/// Public facade over one playback session
pub struct SessionController {
    reader_id: Uuid,
    events: mpsc::UnboundedSender<SessionEvent>,
    snapshots: watch::Receiver<StateSnapshot>,
    /// Frame queues whose observers are detached on terminate
    watched_queues: Mutex<Vec<FrameQueue>>,
}

impl SessionController {
    /// Start a playback session: spawn the machine and post the initial seek
    ///
    /// `on_error` fires at most once, with the backend's result code, before
    /// the teardown cycle begins. The shutdown guard is released when the
    /// machine is dropped after reaching `Terminated`.
    pub fn start(
        position_ms: u64,
        reader_id: Uuid,
        backend: Box<dyn PlaybackBackend>,
        on_error: Option<ErrorCallback>,
        guard: ShutdownGuard,
    ) -> Self {
        let (events, snapshots) = PlaybackMachine::spawn(reader_id, backend, on_error, guard);

        info!("Session {}: starting at {}ms", reader_id, position_ms);
        let _ = events.send(SessionEvent::Seek(position_ms));

        Self {
            reader_id,
            events,
            snapshots,
            watched_queues: Mutex::new(Vec::new()),
        }
    }

    /// Reader identity for diagnostics
    pub fn reader_id(&self) -> Uuid {
        self.reader_id
    }

    /// Post an event onto the session's serialized queue
    ///
    /// Posting to an already-terminated session is a documented no-op.
    pub fn post(&self, event: SessionEvent) {
        if self.events.send(event).is_err() {
            debug!("Session {}: {} posted after termination, ignored", self.reader_id, event);
        }
    }

    /// Request cancellation
    ///
    /// Detaches every watched frame-queue observer immediately, so no
    /// further queue-depth events are produced, then posts `UserCancel`.
    /// The machine keeps running until teardown completes.
    pub fn terminate(&self) {
        info!("Session {}: terminate requested", self.reader_id);
        for queue in self.watched_queues.lock().unwrap().drain(..) {
            queue.detach();
        }
        self.post(SessionEvent::UserCancel);
    }

    /// Register a frame queue whose observer should be detached on terminate
    pub fn watch_queue(&self, queue: FrameQueue) {
        self.watched_queues.lock().unwrap().push(queue);
    }

    /// Snapshot stream; publishes after every accepted transition
    pub fn snapshots(&self) -> watch::Receiver<StateSnapshot> {
        self.snapshots.clone()
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> StateSnapshot {
        *self.snapshots.borrow()
    }

    /// Wait until the session reaches `Terminated`
    pub async fn wait_terminated(&self) {
        let mut snapshots = self.snapshots.clone();
        // An Err means the machine is already gone, which is also terminal
        let _ = snapshots.wait_for(|snap| snap.mode == Mode::Terminated).await;
    }

    /// Build a depth-observation bridge for this session
    ///
    /// Validates the config's threshold ordering.
    pub fn depth_bridge(&self, config: &SessionConfig) -> Result<DepthBridge> {
        config.validate()?;
        Ok(DepthBridge {
            events: self.events.clone(),
            underflow_threshold: config.underflow_threshold,
            overflow_threshold: config.overflow_threshold,
        })
    }
}

/// Converts frame-queue depth observations into flow-control events
///
/// A lightweight, cloneable forwarder holding only the session's event
/// sender: depth above the overflow threshold posts `QueueOverflow`, depth
/// below the underflow threshold posts `QueueUnderflow`, depths between the
/// thresholds post nothing. Calling [`DepthBridge::observe`] after the
/// session has terminated is a safe no-op.
#[derive(Clone)]
pub struct DepthBridge {
    events: mpsc::UnboundedSender<SessionEvent>,
    underflow_threshold: usize,
    overflow_threshold: usize,
}

impl DepthBridge {
    pub fn observe(&self, depth: usize) {
        if depth > self.overflow_threshold {
            let _ = self.events.send(SessionEvent::QueueOverflow);
        } else if depth < self.underflow_threshold {
            let _ = self.events.send(SessionEvent::QueueUnderflow);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_bridge_band() {
        let (events, mut rx) = mpsc::unbounded_channel();
        let bridge = DepthBridge {
            events,
            underflow_threshold: 10,
            overflow_threshold: 20,
        };

        // Inside the band, including both boundaries: nothing posted
        for depth in [10, 15, 19, 20] {
            bridge.observe(depth);
        }
        assert!(rx.try_recv().is_err());

        bridge.observe(21);
        assert_eq!(rx.try_recv().unwrap(), SessionEvent::QueueOverflow);

        bridge.observe(9);
        assert_eq!(rx.try_recv().unwrap(), SessionEvent::QueueUnderflow);
    }

    #[test]
    fn test_depth_bridge_after_receiver_gone() {
        let (events, rx) = mpsc::unbounded_channel::<SessionEvent>();
        drop(rx);
        let bridge = DepthBridge {
            events,
            underflow_threshold: 4,
            overflow_threshold: 8,
        };
        // Safe no-op once the session is gone
        bridge.observe(100);
        bridge.observe(0);
    }
}
