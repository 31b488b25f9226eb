//! Playback state machine
//!
//! Encodes the legal sequencing of backend commands and the queue-depth
//! driven play/pause decisions, guaranteeing at most one outstanding backend
//! command at any time.
//!
//! The machine runs as an actor: a spawned task owns it and consumes events
//! one at a time from an unbounded channel, in posting order. Backend
//! completions re-enter through the same channel, never inline, so a
//! backend that completes synchronously and reentrantly is still processed
//! strictly after the command that triggered it. Reaching `Terminated`
//! breaks the loop and the task drops the machine on its way out, never
//! while a handler on that machine is still on the stack.
//!
//! Mode transitions are evaluated before the state transition table, and
//! any (state, event) pair absent from the table is accepted and discarded:
//! queue-depth events can legitimately arrive before or after the machine
//! is in a state that cares about them.

use crate::playback::backend::{Completion, PlaybackBackend, ResultCode, RESULT_OK};
use crate::playback::events::{Mode, SessionEvent, State, StateSnapshot};
use crate::playback::shutdown::ShutdownGuard;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Backend commands the machine can issue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Seek(u64),
    Play,
    Pause,
    Teardown,
}

/// Error callback, invoked at most once per session
pub type ErrorCallback = Box<dyn FnOnce(ResultCode) + Send + 'static>;

pub(crate) struct PlaybackMachine {
    /// Reader identity, diagnostics only
    reader_id: Uuid,
    state: State,
    mode: Mode,
    /// True while a seek/play/pause command awaits its completion
    busy: bool,
    backend: Box<dyn PlaybackBackend>,
    on_error: Option<ErrorCallback>,
    /// Sender onto the machine's own event queue, used by completions.
    /// Holding it keeps the channel open while commands are in flight.
    events: mpsc::UnboundedSender<SessionEvent>,
    snapshots: watch::Sender<StateSnapshot>,
    /// Released when the actor task drops the machine after `Terminated`
    _guard: ShutdownGuard,
}

impl PlaybackMachine {
    /// Spawn the machine's actor task
    ///
    /// Returns the event sender (the only way to reach the machine) and a
    /// watch receiver publishing a snapshot after every accepted transition.
    pub(crate) fn spawn(
        reader_id: Uuid,
        backend: Box<dyn PlaybackBackend>,
        on_error: Option<ErrorCallback>,
        guard: ShutdownGuard,
    ) -> (
        mpsc::UnboundedSender<SessionEvent>,
        watch::Receiver<StateSnapshot>,
    ) {
        let (events, rx) = mpsc::unbounded_channel();
        let (snapshots, snapshot_rx) = watch::channel(StateSnapshot::initial());

        let machine = Self {
            reader_id,
            state: State::Idle,
            mode: Mode::Normal,
            busy: false,
            backend,
            on_error,
            events: events.clone(),
            snapshots,
            _guard: guard,
        };

        info!("Playback session {} created", reader_id);
        tokio::spawn(machine.run(rx));

        (events, snapshot_rx)
    }

    /// Actor loop: one event at a time, in posting order
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<SessionEvent>) {
        while self.mode != Mode::Terminated {
            match rx.recv().await {
                Some(event) => self.handle(event),
                // Unreachable while the machine holds its own sender
                None => break,
            }
        }
        info!("Playback session {} terminated", self.reader_id);
        // The machine (backend, shutdown guard) is dropped here, after the
        // final handler has fully returned.
    }

    fn handle(&mut self, event: SessionEvent) {
        debug!(
            "Session {}: event {} in ({}, {})",
            self.reader_id, event, self.state, self.mode
        );

        // Mode guard first: outside Normal, only the expected exit event
        // is honored, everything else is swallowed.
        match self.mode {
            Mode::Normal => self.handle_normal(event),
            Mode::UserCancelled => {
                if event == SessionEvent::OperationCompleted {
                    self.busy = false;
                    self.enter_terminating();
                } else {
                    debug!("Session {}: discarding {} while cancelled", self.reader_id, event);
                }
            }
            Mode::Terminating => {
                if event == SessionEvent::OperationCompleted {
                    self.set_mode(Mode::Terminated);
                } else {
                    debug!("Session {}: discarding {} while terminating", self.reader_id, event);
                }
            }
            Mode::Terminated => {
                debug!("Session {}: discarding {} after termination", self.reader_id, event);
            }
        }
    }

    fn handle_normal(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Error(code) => {
                warn!("Session {}: backend error {}", self.reader_id, code);
                if let Some(on_error) = self.on_error.take() {
                    on_error(code);
                }
                self.enter_terminating();
            }
            SessionEvent::UserCancel => {
                if self.busy {
                    // A command still owes its completion; teardown must
                    // wait for it.
                    self.set_mode(Mode::UserCancelled);
                } else {
                    self.enter_terminating();
                }
            }
            SessionEvent::OperationCompleted => {
                // The matching OperationOk / Error follows on the queue;
                // only the busy flag changes here.
                self.busy = false;
                self.publish();
            }
            SessionEvent::Seek(position_ms) if self.state == State::Idle => {
                self.set_state(State::SeekSent);
                self.issue(Command::Seek(position_ms));
            }
            SessionEvent::OperationOk => match self.state {
                State::SeekSent => {
                    self.set_state(State::PlaySent);
                    self.issue(Command::Play);
                }
                State::PlaySent => self.set_state(State::Playing),
                State::PauseSent => self.set_state(State::Paused),
                _ => self.discard(event),
            },
            SessionEvent::QueueOverflow if self.state == State::Playing => {
                self.set_state(State::PauseSent);
                self.issue(Command::Pause);
            }
            SessionEvent::QueueUnderflow if self.state == State::Paused => {
                self.set_state(State::PlaySent);
                self.issue(Command::Play);
            }
            other => self.discard(other),
        }
    }

    /// No-transition policy: accepted, no state change, no backend call
    fn discard(&self, event: SessionEvent) {
        debug!(
            "Session {}: no transition for {} in ({}, {})",
            self.reader_id, event, self.state, self.mode
        );
    }

    /// Enter `Terminating` and issue the session's single teardown
    fn enter_terminating(&mut self) {
        self.set_mode(Mode::Terminating);
        self.issue(Command::Teardown);
    }

    /// Issue a backend command with a completion that re-enters the event
    /// queue
    fn issue(&mut self, command: Command) {
        debug!("Session {}: issuing {:?}", self.reader_id, command);
        let done = self.completion();
        match command {
            Command::Seek(position_ms) => {
                self.busy = true;
                self.backend.seek(position_ms, done);
            }
            Command::Play => {
                self.busy = true;
                self.backend.play(done);
            }
            Command::Pause => {
                self.busy = true;
                self.backend.pause(done);
            }
            // Teardown completion is treated as done regardless of its
            // result code; busy only tracks the table's command states.
            Command::Teardown => self.backend.teardown(done),
        }
        self.publish();
    }

    /// Completion that posts `OperationCompleted` followed by the result,
    /// preserving queue order even for synchronous reentrant backends
    fn completion(&self) -> Completion {
        let events = self.events.clone();
        Box::new(move |code: ResultCode| {
            let _ = events.send(SessionEvent::OperationCompleted);
            let result = if code == RESULT_OK {
                SessionEvent::OperationOk
            } else {
                SessionEvent::Error(code)
            };
            let _ = events.send(result);
        })
    }

    fn set_state(&mut self, state: State) {
        debug!("Session {}: state {} -> {}", self.reader_id, self.state, state);
        self.state = state;
        self.publish();
    }

    fn set_mode(&mut self, mode: Mode) {
        info!("Session {}: mode {} -> {}", self.reader_id, self.mode, mode);
        self.mode = mode;
        self.publish();
    }

    fn publish(&self) {
        self.snapshots.send_replace(StateSnapshot {
            state: self.state,
            mode: self.mode,
            busy: self.busy,
        });
    }
}

impl Drop for PlaybackMachine {
    fn drop(&mut self) {
        // Sessions must be driven to Terminated before release; anything
        // else left the backend without its teardown.
        if self.mode != Mode::Terminated {
            error!(
                "Session {} dropped in ({}, {}) before teardown completed",
                self.reader_id, self.state, self.mode
            );
        }
    }
}
