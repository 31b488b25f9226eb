//! Session composition
//!
//! Wires one playback backend together with one video frame queue and,
//! optionally, one audio frame queue for a single streaming session. All
//! termination causes (backend error, user cancel, natural end of stream)
//! converge on a single uniform signal: one synthetic end-of-stream frame
//! injected into each adapter. Consumers never see raw backend error codes
//! on the frame path; the last code is recorded and readable via
//! [`StreamSession::last_error`].

use crate::config::SessionConfig;
use crate::error::Result;
use crate::playback::backend::{PlaybackBackend, ResultCode};
use crate::playback::controller::{DepthBridge, SessionController};
use crate::playback::events::Mode;
use crate::playback::frame_queue::{Frame, FrameConsumer, FrameQueue};
use crate::playback::machine::ErrorCallback;
use crate::playback::shutdown::ShutdownGuard;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// One wired streaming session: controller + frame adapter(s)
pub struct StreamSession {
    config: SessionConfig,
    controller: SessionController,
    video: FrameQueue,
    audio: Option<FrameQueue>,
    last_error: Arc<Mutex<Option<ResultCode>>>,
}

impl StreamSession {
    /// Start a session at `position_ms`
    ///
    /// `with_audio` adds a second frame queue sharing the session's error
    /// path. The shutdown guard is released once teardown has completed and
    /// the machine is gone.
    pub fn start(
        config: SessionConfig,
        position_ms: u64,
        backend: Box<dyn PlaybackBackend>,
        guard: ShutdownGuard,
        with_audio: bool,
    ) -> Result<Self> {
        config.validate()?;

        let reader_id = Uuid::new_v4();
        let video = FrameQueue::new(config.max_queue_length);
        let audio = with_audio.then(|| FrameQueue::new(config.max_queue_length));

        let last_error = Arc::new(Mutex::new(None));
        let on_error: ErrorCallback = {
            let last_error = Arc::clone(&last_error);
            Box::new(move |code: ResultCode| {
                warn!("Session error recorded (code {})", code);
                *last_error.lock().unwrap() = Some(code);
            })
        };

        let controller =
            SessionController::start(position_ms, reader_id, backend, Some(on_error), guard);
        controller.watch_queue(video.clone());
        if let Some(audio) = &audio {
            controller.watch_queue(audio.clone());
        }

        Self::spawn_eos_watcher(&controller, video.clone(), audio.clone());

        info!(
            "Stream session {} started (audio: {})",
            reader_id, with_audio
        );
        Ok(Self {
            config,
            controller,
            video,
            audio,
            last_error,
        })
    }

    /// Inject one end-of-stream frame per adapter when the session leaves
    /// normal operation, whatever the cause
    fn spawn_eos_watcher(
        controller: &SessionController,
        video: FrameQueue,
        audio: Option<FrameQueue>,
    ) {
        let mut snapshots = controller.snapshots();
        tokio::spawn(async move {
            if snapshots
                .wait_for(|snap| snap.mode != Mode::Normal)
                .await
                .is_err()
            {
                // Machine already gone; it left Normal mode on its way out
                debug!("Session ended before the end-of-stream watcher saw it");
            }
            video.receive_frame(Frame::end_of_stream());
            if let Some(audio) = &audio {
                audio.receive_frame(Frame::end_of_stream());
            }
        });
    }

    /// Attach the pull consumer to the video queue
    ///
    /// The consumer's depth observations also drive the session's play/pause
    /// flow control through the configured thresholds.
    pub fn attach_consumer(&self, consumer: Box<dyn FrameConsumer>) -> Result<()> {
        let bridge = self.controller.depth_bridge(&self.config)?;
        self.video.attach(Box::new(BridgedConsumer {
            bridge,
            inner: consumer,
        }));
        Ok(())
    }

    /// Attach a pull consumer to the audio queue, if the session has one
    ///
    /// Audio depth does not drive flow control; the video stream paces the
    /// session.
    pub fn attach_audio_consumer(&self, consumer: Box<dyn FrameConsumer>) -> bool {
        match &self.audio {
            Some(audio) => {
                audio.attach(consumer);
                true
            }
            None => false,
        }
    }

    /// Producer-side handle to the video queue
    pub fn video_queue(&self) -> FrameQueue {
        self.video.clone()
    }

    /// Producer-side handle to the audio queue, if any
    pub fn audio_queue(&self) -> Option<FrameQueue> {
        self.audio.clone()
    }

    /// Last backend error code, if any command failed
    pub fn last_error(&self) -> Option<ResultCode> {
        *self.last_error.lock().unwrap()
    }

    /// Session controller, for direct event posting and state observation
    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    /// Tear down the controller and both adapters
    ///
    /// Returns the video adapter's outstanding credit at detach time for
    /// diagnostics. The backend teardown proceeds asynchronously; await
    /// completion through a shutdown tracker or
    /// [`SessionController::wait_terminated`].
    pub fn reset(&self) -> u32 {
        let credit = self.video.detach();
        if let Some(audio) = &self.audio {
            audio.detach();
        }
        self.controller.terminate();
        credit
    }
}

/// Forwards depth observations to the flow-control bridge before handing
/// them (and the frames) to the real consumer
struct BridgedConsumer {
    bridge: DepthBridge,
    inner: Box<dyn FrameConsumer>,
}

impl FrameConsumer for BridgedConsumer {
    fn on_depth(&mut self, depth: usize) {
        self.bridge.observe(depth);
        self.inner.on_depth(depth);
    }

    fn on_frame(&mut self, frame: Frame) {
        self.inner.on_frame(frame);
    }
}
