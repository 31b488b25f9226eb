//! # vod-core
//!
//! Playback-control core for an archival video streaming path.
//!
//! **Purpose:** drive a remote playback backend (seek/play/pause/teardown,
//! each completing asynchronously) so that a pull-based frame consumer can
//! read decoded frames at its own pace while the backend pushes frames at
//! its own pace.
//!
//! **Architecture:** one actor task per session serializes all state-machine
//! transitions; a bounded frame queue bridges the push producer to the
//! credit-driven pull consumer; queue depth feeds back into play/pause
//! commands through configurable thresholds.
//!
//! The crate guarantees:
//! - at most one backend command in flight at any time,
//! - user cancellation never tears the backend down while it still owes a
//!   completion for a prior command,
//! - `teardown` is invoked exactly once per session, whether termination is
//!   caused by error, cancellation, or natural sequencing.

pub mod config;
pub mod error;
pub mod playback;

pub use config::SessionConfig;
pub use error::{Error, Result};
pub use playback::backend::{Completion, PlaybackBackend, ResultCode};
pub use playback::controller::{DepthBridge, SessionController};
pub use playback::events::{Mode, SessionEvent, State, StateSnapshot};
pub use playback::frame_queue::{Frame, FrameConsumer, FrameQueue};
pub use playback::machine::ErrorCallback;
pub use playback::session::StreamSession;
pub use playback::shutdown::{ShutdownGuard, ShutdownTracker};
