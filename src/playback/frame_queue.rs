//! Push-to-pull frame adapter
//!
//! Decouples an asynchronous push producer (the backend delivers frames
//! whenever it has them) from a pull consumer that requests frames in
//! integer units of credit, while bounding memory.
//!
//! Design:
//! - Producer thread calls [`FrameQueue::receive_frame`]; consumer thread
//!   calls [`FrameQueue::request`] / [`FrameQueue::detach`]. Queue, credit
//!   and drop counters share one lock; the attached consumer sits behind a
//!   second lock so delivery never holds the queue lock.
//! - Re-evaluation runs on a dedicated drain task, poked once per mutating
//!   call, so depth observations are exact and never stale by the time the
//!   consumer acts on them.
//! - At capacity, data frames are dropped and counted; end-of-stream
//!   markers are always accepted so the consumer's termination signal is
//!   never lost.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Log the first drop of a run, then every Nth
const DROP_LOG_INTERVAL: u64 = 100;

/// One decoded frame, or the end-of-stream marker
///
/// An empty payload designates end of stream. EOS travels through the same
/// queue as data frames, so its ordering relative to the last real frame is
/// preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub payload: Vec<u8>,
    pub timestamp_ms: u64,
}

impl Frame {
    pub fn new(payload: Vec<u8>, timestamp_ms: u64) -> Self {
        Self {
            payload,
            timestamp_ms,
        }
    }

    /// The designated end-of-stream marker
    pub fn end_of_stream() -> Self {
        Self {
            payload: Vec::new(),
            timestamp_ms: 0,
        }
    }

    pub fn is_end_of_stream(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Pull-side consumer attached to a [`FrameQueue`]
///
/// `on_depth` is invoked with the post-drain queue length before the drained
/// frames are delivered, so a depth-driven flow controller never acts on a
/// stale reading.
pub trait FrameConsumer: Send + 'static {
    /// Queue depth after the latest re-evaluation
    fn on_depth(&mut self, depth: usize);

    /// One delivered frame; called once per unit of consumed credit
    fn on_frame(&mut self, frame: Frame);
}

struct QueueShared {
    queue: VecDeque<Frame>,
    credit: u32,
    /// Consecutive drops since the last successful enqueue or drain
    drop_run: u64,
    /// Cumulative drops over the adapter's lifetime
    dropped_total: u64,
}

struct QueueInner {
    max_len: usize,
    // Lock order: consumer before shared, everywhere both are taken
    consumer: Mutex<Option<Box<dyn FrameConsumer>>>,
    shared: Mutex<QueueShared>,
}

/// Bounded push-to-pull frame queue handle
///
/// Handles are cheap clones sharing one queue; the drain task exits when the
/// last handle is dropped.
#[derive(Clone)]
pub struct FrameQueue {
    inner: Arc<QueueInner>,
    poke: mpsc::UnboundedSender<()>,
}

impl FrameQueue {
    /// Create a queue bounded at `max_len` data frames and spawn its drain task
    pub fn new(max_len: usize) -> Self {
        let inner = Arc::new(QueueInner {
            max_len,
            consumer: Mutex::new(None),
            shared: Mutex::new(QueueShared {
                queue: VecDeque::new(),
                credit: 0,
                drop_run: 0,
                dropped_total: 0,
            }),
        });

        let (poke, mut poke_rx) = mpsc::unbounded_channel();
        let drain_inner = Arc::clone(&inner);
        tokio::spawn(async move {
            while poke_rx.recv().await.is_some() {
                Self::drain(&drain_inner);
            }
            debug!("Frame queue drain task exiting");
        });

        Self { inner, poke }
    }

    /// Producer entry point: enqueue a frame, or drop it at capacity
    ///
    /// End-of-stream markers bypass the capacity check.
    pub fn receive_frame(&self, frame: Frame) {
        {
            let mut shared = self.inner.shared.lock().unwrap();
            if !frame.is_end_of_stream() && shared.queue.len() >= self.max_len() {
                shared.dropped_total += 1;
                shared.drop_run += 1;
                let run = shared.drop_run;
                let total = shared.dropped_total;
                drop(shared);
                if run == 1 || run % DROP_LOG_INTERVAL == 0 {
                    warn!(
                        "Frame queue full ({} frames), dropping (run: {}, total: {})",
                        self.max_len(),
                        run,
                        total
                    );
                }
                return;
            }
            shared.queue.push_back(frame);
            shared.drop_run = 0;
        }
        let _ = self.poke.send(());
    }

    /// Consumer entry point: add `count` units of credit
    ///
    /// Credit accumulates across calls and is consumed one unit per
    /// delivered frame.
    pub fn request(&self, count: u32) {
        {
            let mut shared = self.inner.shared.lock().unwrap();
            shared.credit = shared.credit.saturating_add(count);
        }
        let _ = self.poke.send(());
    }

    /// Attach (or replace) the pull-side consumer
    ///
    /// Re-evaluation is scheduled by `receive_frame` and `request`; a
    /// consumer attached over a non-empty queue sees its first depth
    /// observation on the next of either call.
    pub fn attach(&self, consumer: Box<dyn FrameConsumer>) {
        *self.inner.consumer.lock().unwrap() = Some(consumer);
    }

    /// Detach the consumer; returns the outstanding credit for diagnostics
    ///
    /// Synchronizes with any in-progress delivery: once this returns, no
    /// further callback on the detached consumer will run.
    pub fn detach(&self) -> u32 {
        let mut consumer = self.inner.consumer.lock().unwrap();
        consumer.take();
        let shared = self.inner.shared.lock().unwrap();
        shared.credit
    }

    /// Current queue depth (diagnostics)
    pub fn depth(&self) -> usize {
        self.inner.shared.lock().unwrap().queue.len()
    }

    /// Cumulative dropped-frame count (diagnostics)
    pub fn dropped(&self) -> u64 {
        self.inner.shared.lock().unwrap().dropped_total
    }

    fn max_len(&self) -> usize {
        self.inner.max_len
    }

    /// One re-evaluation pass, run on the drain task only
    ///
    /// Pops while credit and frames are both available, reports the
    /// post-drain depth, then delivers the popped frames in FIFO order.
    fn drain(inner: &QueueInner) {
        let mut consumer_slot = inner.consumer.lock().unwrap();
        let consumer = match consumer_slot.as_mut() {
            Some(consumer) => consumer,
            // Nobody listening: leave frames queued and credit intact
            None => return,
        };

        let (delivered, depth) = {
            let mut shared = inner.shared.lock().unwrap();
            let mut delivered = Vec::new();
            while shared.credit > 0 {
                match shared.queue.pop_front() {
                    Some(frame) => {
                        shared.credit -= 1;
                        delivered.push(frame);
                    }
                    None => break,
                }
            }
            if !delivered.is_empty() {
                shared.drop_run = 0;
            }
            (delivered, shared.queue.len())
        };

        consumer.on_depth(depth);
        for frame in delivered {
            consumer.on_frame(frame);
        }
    }
}
