//! Playback backend abstraction
//!
//! The backend is the codec/device-specific engine this crate drives. It is
//! consumed through a narrow command interface: every command takes a
//! completion that the backend must invoke exactly once, synchronously or
//! later from any thread, with a result code. A backend that never invokes
//! a completion hangs its session; that is a contract violation on the
//! backend side, not something this crate recovers from.

/// Backend result code; 0 is success, anything else is backend-defined
pub type ResultCode = i32;

/// Success result code
pub const RESULT_OK: ResultCode = 0;

/// One-shot completion callback handed to every backend command
pub type Completion = Box<dyn FnOnce(ResultCode) + Send + 'static>;

/// Abstract playback engine driven by the state machine
///
/// The state machine guarantees at most one command is outstanding at any
/// time and never issues `teardown` while an earlier command still owes its
/// completion. Implementations may invoke the completion reentrantly from
/// inside the command call; the caller posts the result back onto its own
/// event queue, so reentrancy is safe.
pub trait PlaybackBackend: Send + 'static {
    /// Position the stream at `position_ms` and prepare frame delivery
    fn seek(&mut self, position_ms: u64, done: Completion);

    /// Begin or resume pushing frames
    fn play(&mut self, done: Completion);

    /// Stop pushing frames without losing position
    fn pause(&mut self, done: Completion);

    /// Release all backend resources; always the final command of a session
    fn teardown(&mut self, done: Completion);
}
