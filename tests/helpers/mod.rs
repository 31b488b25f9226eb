//! Test helpers for the vod-core integration suites
//!
//! - `MockBackend`: scripted playback backend recording every command, with
//!   immediate or manually-driven completions
//! - `RecordingConsumer`: frame consumer capturing depth observations and
//!   delivered frames
//! - `wait_until`: timeout-guarded polling for cross-task assertions

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use vod_core::{Completion, Frame, FrameConsumer, PlaybackBackend, ResultCode};

/// One recorded backend invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendCall {
    Seek(u64),
    Play,
    Pause,
    Teardown,
}

#[derive(Default)]
struct MockShared {
    calls: Mutex<Vec<BackendCall>>,
    pending: Mutex<VecDeque<(ResultCode, Completion)>>,
}

/// Scripted playback backend
///
/// Immediate mode invokes completions synchronously from inside the command
/// call (the reentrant path); manual mode parks them until the test calls
/// [`MockHandle::complete_next`].
pub struct MockBackend {
    shared: Arc<MockShared>,
    manual: bool,
    seek_code: ResultCode,
    play_code: ResultCode,
    pause_code: ResultCode,
    teardown_code: ResultCode,
}

/// Test-side view of a [`MockBackend`]
#[derive(Clone)]
pub struct MockHandle {
    shared: Arc<MockShared>,
}

impl MockBackend {
    fn build(manual: bool, seek_code: ResultCode) -> (Box<dyn PlaybackBackend>, MockHandle) {
        let shared = Arc::new(MockShared::default());
        let handle = MockHandle {
            shared: Arc::clone(&shared),
        };
        let backend = Box::new(Self {
            shared,
            manual,
            seek_code,
            play_code: 0,
            pause_code: 0,
            teardown_code: 0,
        });
        (backend, handle)
    }

    /// Every command succeeds, completing synchronously
    pub fn immediate() -> (Box<dyn PlaybackBackend>, MockHandle) {
        Self::build(false, 0)
    }

    /// Seek fails synchronously with `code`; everything else succeeds
    pub fn failing_seek(code: ResultCode) -> (Box<dyn PlaybackBackend>, MockHandle) {
        Self::build(false, code)
    }

    /// Completions are parked until the test drives them
    pub fn manual() -> (Box<dyn PlaybackBackend>, MockHandle) {
        Self::build(true, 0)
    }

    fn record(&self, call: BackendCall) {
        self.shared.calls.lock().unwrap().push(call);
    }

    fn finish(&self, code: ResultCode, done: Completion) {
        if self.manual {
            self.shared.pending.lock().unwrap().push_back((code, done));
        } else {
            done(code);
        }
    }
}

// Completions are parked (or invoked) before the call is recorded, so a
// test that has seen the call can always drive its completion.
impl PlaybackBackend for MockBackend {
    fn seek(&mut self, position_ms: u64, done: Completion) {
        self.finish(self.seek_code, done);
        self.record(BackendCall::Seek(position_ms));
    }

    fn play(&mut self, done: Completion) {
        self.finish(self.play_code, done);
        self.record(BackendCall::Play);
    }

    fn pause(&mut self, done: Completion) {
        self.finish(self.pause_code, done);
        self.record(BackendCall::Pause);
    }

    fn teardown(&mut self, done: Completion) {
        self.finish(self.teardown_code, done);
        self.record(BackendCall::Teardown);
    }
}

impl MockHandle {
    pub fn calls(&self) -> Vec<BackendCall> {
        self.shared.calls.lock().unwrap().clone()
    }

    pub fn count(&self, wanted: BackendCall) -> usize {
        self.calls().iter().filter(|call| **call == wanted).count()
    }

    pub fn count_plays(&self) -> usize {
        self.count(BackendCall::Play)
    }

    pub fn count_pauses(&self) -> usize {
        self.count(BackendCall::Pause)
    }

    pub fn count_teardowns(&self) -> usize {
        self.count(BackendCall::Teardown)
    }

    /// Number of parked completions (manual mode)
    pub fn pending(&self) -> usize {
        self.shared.pending.lock().unwrap().len()
    }

    /// Complete the oldest parked command with the code it was scripted for
    pub fn complete_next(&self) -> bool {
        self.complete_next_with(None)
    }

    /// Complete the oldest parked command, overriding its result code
    pub fn complete_next_as(&self, code: ResultCode) -> bool {
        self.complete_next_with(Some(code))
    }

    fn complete_next_with(&self, override_code: Option<ResultCode>) -> bool {
        let parked = self.shared.pending.lock().unwrap().pop_front();
        match parked {
            Some((code, done)) => {
                done(override_code.unwrap_or(code));
                true
            }
            None => false,
        }
    }
}

/// Frame consumer recording every observation for later assertions
pub struct RecordingConsumer {
    depths: Arc<Mutex<Vec<usize>>>,
    frames: Arc<Mutex<Vec<Frame>>>,
}

/// Test-side view of a [`RecordingConsumer`]
#[derive(Clone)]
pub struct RecordingHandle {
    depths: Arc<Mutex<Vec<usize>>>,
    frames: Arc<Mutex<Vec<Frame>>>,
}

impl RecordingConsumer {
    pub fn new() -> (Box<dyn FrameConsumer>, RecordingHandle) {
        let depths = Arc::new(Mutex::new(Vec::new()));
        let frames = Arc::new(Mutex::new(Vec::new()));
        let handle = RecordingHandle {
            depths: Arc::clone(&depths),
            frames: Arc::clone(&frames),
        };
        (Box::new(Self { depths, frames }), handle)
    }
}

impl FrameConsumer for RecordingConsumer {
    fn on_depth(&mut self, depth: usize) {
        self.depths.lock().unwrap().push(depth);
    }

    fn on_frame(&mut self, frame: Frame) {
        self.frames.lock().unwrap().push(frame);
    }
}

impl RecordingHandle {
    pub fn depths(&self) -> Vec<usize> {
        self.depths.lock().unwrap().clone()
    }

    pub fn frames(&self) -> Vec<Frame> {
        self.frames.lock().unwrap().clone()
    }

    pub fn frame_count(&self) -> usize {
        self.frames.lock().unwrap().len()
    }

    pub fn depth_count(&self) -> usize {
        self.depths.lock().unwrap().len()
    }
}

/// Initialize test logging; safe to call from every test
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Poll `condition` until it holds, panicking after two seconds
pub async fn wait_until<F>(what: &str, condition: F)
where
    F: Fn() -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        if tokio::time::Instant::now() >= deadline {
            panic!("timed out waiting for: {}", what);
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Let the session's event loop drain everything already posted
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}
