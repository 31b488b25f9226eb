//! Session event, state, and mode types
//!
//! Events are immutable value objects posted onto a session's serialized
//! event queue; they carry no ownership. State and mode are orthogonal:
//! state tracks where the command sequence is, mode tracks how the session
//! is ending (if it is).

use crate::playback::backend::ResultCode;

/// Command-sequencing state of a session
///
/// `SeekSent`, `PlaySent` and `PauseSent` are command-in-flight states: a
/// backend command has been issued and its completion has not yet been
/// observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// No command issued yet
    Idle,
    /// `seek` issued, completion outstanding
    SeekSent,
    /// `play` issued, completion outstanding
    PlaySent,
    /// Backend is pushing frames
    Playing,
    /// `pause` issued, completion outstanding
    PauseSent,
    /// Backend is holding position, not pushing
    Paused,
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            State::Idle => write!(f, "Idle"),
            State::SeekSent => write!(f, "SeekSent"),
            State::PlaySent => write!(f, "PlaySent"),
            State::Playing => write!(f, "Playing"),
            State::PauseSent => write!(f, "PauseSent"),
            State::Paused => write!(f, "Paused"),
        }
    }
}

/// Termination mode of a session, orthogonal to [`State`]
///
/// Once mode leaves `Normal` it never returns; `Terminated` is absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Regular operation; the transition table applies
    Normal,
    /// Cancel requested while a command was in flight; waiting for its
    /// completion before tearing down. Every event except
    /// `OperationCompleted` is discarded here.
    UserCancelled,
    /// `teardown` issued; waiting for its completion
    Terminating,
    /// Session finished; all events are discarded
    Terminated,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Normal => write!(f, "Normal"),
            Mode::UserCancelled => write!(f, "UserCancelled"),
            Mode::Terminating => write!(f, "Terminating"),
            Mode::Terminated => write!(f, "Terminated"),
        }
    }
}

/// Events consumed by the playback state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Start the command sequence at the given position
    Seek(u64),
    /// The outstanding command succeeded
    OperationOk,
    /// Frame queue depth rose above the overflow threshold
    QueueOverflow,
    /// Frame queue depth fell below the underflow threshold
    QueueUnderflow,
    /// The outstanding command failed, or the backend reported a fault
    Error(ResultCode),
    /// User requested cancellation
    UserCancel,
    /// The outstanding command's completion was invoked (precedes the
    /// matching `OperationOk` / `Error` on the event queue)
    OperationCompleted,
}

impl std::fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionEvent::Seek(pos) => write!(f, "Seek({})", pos),
            SessionEvent::OperationOk => write!(f, "OperationOk"),
            SessionEvent::QueueOverflow => write!(f, "QueueOverflow"),
            SessionEvent::QueueUnderflow => write!(f, "QueueUnderflow"),
            SessionEvent::Error(code) => write!(f, "Error({})", code),
            SessionEvent::UserCancel => write!(f, "UserCancel"),
            SessionEvent::OperationCompleted => write!(f, "OperationCompleted"),
        }
    }
}

/// Snapshot of a session's state, published on every accepted transition
///
/// Observers (the session composition, tests, diagnostics) receive these
/// through a `tokio::sync::watch` channel; intermediate snapshots may be
/// skipped by a slow observer, but the latest one is always visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateSnapshot {
    pub state: State,
    pub mode: Mode,
    pub busy: bool,
}

impl StateSnapshot {
    pub fn initial() -> Self {
        Self {
            state: State::Idle,
            mode: Mode::Normal,
            busy: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_states_are_distinct() {
        let states = [
            State::Idle,
            State::SeekSent,
            State::PlaySent,
            State::Playing,
            State::PauseSent,
            State::Paused,
        ];
        for (i, a) in states.iter().enumerate() {
            for (j, b) in states.iter().enumerate() {
                if i == j {
                    assert_eq!(a, b);
                } else {
                    assert_ne!(a, b);
                }
            }
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(State::SeekSent.to_string(), "SeekSent");
        assert_eq!(Mode::UserCancelled.to_string(), "UserCancelled");
        assert_eq!(SessionEvent::Seek(1500).to_string(), "Seek(1500)");
        assert_eq!(SessionEvent::Error(-3).to_string(), "Error(-3)");
    }

    #[test]
    fn test_initial_snapshot() {
        let snap = StateSnapshot::initial();
        assert_eq!(snap.state, State::Idle);
        assert_eq!(snap.mode, Mode::Normal);
        assert!(!snap.busy);
    }

    #[test]
    fn test_events_are_copy() {
        let event = SessionEvent::Error(7);
        let copied = event;
        assert_eq!(event, copied);
    }
}
