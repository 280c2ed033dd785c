//! Capture-and-classify controller.
//!
//! Owns the camera session, the video poll timer and the single-shot busy flag,
//! and turns UI events into submissions to the classification service. Requests
//! run on a tokio runtime; their completions come back over a channel and are
//! applied on the thread that owns the controller (the UI thread).
//!
//! Every submission is stamped with a sequence number. A single shot (upload or
//! photo) always reaches the display when it completes. A video tick only does
//! so if it is the latest tick issued and nothing newer has been shown, so a
//! slow response for an older frame never overwrites a newer result.

use crate::camera::{CameraProvider, CameraStream};
use crate::client::EmotionClient;
use crate::config::CaptureConfig;
use crate::display::{emotion_bars, DisplayState, View};
use crate::encoder;
use crate::error::{CamXucError, Result};
use crate::models::{ClassificationResult, Frame, ImagePayload, ServerHealth};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

const PHOTO_FILE_NAME: &str = "capture.jpg";

/// Where a submission came from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmissionKind {
    /// Dropped or selected file
    Upload,
    /// Countdown photo from the camera
    Photo,
    /// One poll tick of live video recognition
    VideoTick,
}

impl SubmissionKind {
    pub fn is_single_shot(&self) -> bool {
        !matches!(self, SubmissionKind::VideoTick)
    }
}

/// A file handed over by drag and drop
#[derive(Clone, Debug)]
pub struct DroppedImage {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Controller tunables, taken from [`CaptureConfig`]
#[derive(Clone, Debug)]
pub struct ControllerSettings {
    pub poll_interval: Duration,
    pub countdown_secs: u32,
    pub photo_jpeg_quality: u8,
    pub video_jpeg_quality: u8,
}

impl From<&CaptureConfig> for ControllerSettings {
    fn from(config: &CaptureConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            countdown_secs: config.countdown_secs,
            photo_jpeg_quality: config.photo_jpeg_quality,
            video_jpeg_quality: config.video_jpeg_quality,
        }
    }
}

/// Fixed-interval timer driven by [`CaptureController::tick`]
#[derive(Debug)]
struct PollTimer {
    interval: Duration,
    next_due: Instant,
}

impl PollTimer {
    fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            next_due: now + interval,
        }
    }

    /// Returns true once per elapsed interval; missed intervals collapse into one
    fn fire(&mut self, now: Instant) -> bool {
        if now < self.next_due {
            return false;
        }
        while self.next_due <= now {
            self.next_due += self.interval;
        }
        true
    }
}

#[derive(Debug)]
struct Countdown {
    remaining: u32,
    next_step: Instant,
}

/// Live camera state; exists between start and stop
struct CaptureSession {
    camera: Box<dyn CameraStream>,
    poll: Option<PollTimer>,
    countdown: Option<Countdown>,
    last_frame: Option<Frame>,
}

struct Completion {
    seq: u64,
    kind: SubmissionKind,
    source_size: Option<(u32, u32)>,
    outcome: Result<ClassificationResult>,
}

enum ControllerEvent {
    Classified(Completion),
    Health(Result<ServerHealth>),
}

/// The capture-and-classify controller
pub struct CaptureController {
    provider: Box<dyn CameraProvider>,
    client: Arc<EmotionClient>,
    runtime: Handle,
    settings: ControllerSettings,
    events_tx: mpsc::UnboundedSender<ControllerEvent>,
    events_rx: mpsc::UnboundedReceiver<ControllerEvent>,
    session: Option<CaptureSession>,
    /// Sequence number of the pending single-shot submission
    pending_single: Option<u64>,
    /// Sequence number of the in-flight video tick
    pending_video: Option<u64>,
    /// Release the camera once the pending photo completes
    release_after_photo: bool,
    last_seq: u64,
    /// Sequence number of the latest video tick issued
    last_video_seq: u64,
    /// Sequence number of the result currently on display
    shown_seq: u64,
    display: DisplayState,
}

impl CaptureController {
    pub fn new(
        provider: Box<dyn CameraProvider>,
        client: Arc<EmotionClient>,
        runtime: Handle,
        settings: ControllerSettings,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            provider,
            client,
            runtime,
            settings,
            events_tx,
            events_rx,
            session: None,
            pending_single: None,
            pending_video: None,
            release_after_photo: false,
            last_seq: 0,
            last_video_seq: 0,
            shown_seq: 0,
            display: DisplayState::default(),
        }
    }

    /// Starts the controller: queries the service status once
    pub fn init(&mut self) {
        info!("Controller started against {}", self.client.base_url());
        let client = self.client.clone();
        let tx = self.events_tx.clone();
        self.runtime.spawn(async move {
            let health = client.health_check().await;
            let _ = tx.send(ControllerEvent::Health(health));
        });
    }

    /// Releases the camera and stops polling; called on shutdown
    pub fn dispose(&mut self) {
        info!("Controller disposing");
        self.stop_video_recognition();
    }

    pub fn display(&self) -> &DisplayState {
        &self.display
    }

    pub fn is_camera_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn is_polling(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.poll.is_some())
    }

    pub fn is_busy(&self) -> bool {
        self.pending_single.is_some()
    }

    /// Most recent live frame, for the video surface
    pub fn live_frame(&self) -> Option<&Frame> {
        self.session.as_ref().and_then(|s| s.last_frame.as_ref())
    }

    /// Opens the camera and switches to the live view
    pub fn start_camera(&mut self) -> Result<()> {
        if self.session.is_some() {
            debug!("Camera already open");
            return Ok(());
        }

        match self.provider.open() {
            Ok(camera) => {
                self.session = Some(CaptureSession {
                    camera,
                    poll: None,
                    countdown: None,
                    last_frame: None,
                });
                self.display.view = View::LiveCamera;
                info!("Camera started");
                Ok(())
            }
            Err(e) => {
                error!("Error accessing camera: {}", e);
                self.display
                    .show_error(format!("Không thể truy cập camera: {e}"));
                Err(e)
            }
        }
    }

    /// Opens the camera and samples one frame per poll interval
    pub fn start_video_recognition(&mut self) -> Result<()> {
        self.start_camera()?;
        let interval = self.settings.poll_interval;
        if let Some(session) = self.session.as_mut() {
            if session.poll.is_none() {
                session.poll = Some(PollTimer::new(interval, Instant::now()));
                info!("Video recognition started ({:?} interval)", interval);
            }
        }
        Ok(())
    }

    /// Stops the camera and the poll timer; idempotent
    pub fn stop_video_recognition(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.camera.stop();
            info!("Camera released");
        }
        self.pending_video = None;
        self.release_after_photo = false;
        self.display.countdown = None;
        self.display.view = View::DropZone;
    }

    /// Starts the photo countdown; rejected while a single shot is pending
    pub fn capture_photo(&mut self) -> Result<()> {
        if self.pending_single.is_some()
            || self
                .session
                .as_ref()
                .is_some_and(|s| s.countdown.is_some())
        {
            warn!("Photo capture rejected: submission pending");
            return Err(CamXucError::SubmissionPending);
        }

        self.start_camera()?;

        if self.settings.countdown_secs == 0 {
            return self.take_photo();
        }

        let remaining = self.settings.countdown_secs;
        if let Some(session) = self.session.as_mut() {
            session.countdown = Some(Countdown {
                remaining,
                next_step: Instant::now() + Duration::from_secs(1),
            });
        }
        self.display.countdown = Some(remaining);
        Ok(())
    }

    /// Submits a dropped file without a preview
    pub fn handle_drop(&mut self, file: DroppedImage) -> Result<u64> {
        let info = match encoder::inspect_image(&file.bytes) {
            Ok(info) => info,
            Err(e) => {
                warn!("Rejected dropped file {}: {}", file.name, e);
                self.display.show_error(e.to_string());
                return Err(e);
            }
        };

        let payload = ImagePayload::Blob {
            bytes: file.bytes,
            file_name: file.name,
            mime: info.mime.to_string(),
        };
        self.process_image(
            payload,
            SubmissionKind::Upload,
            Some((info.width, info.height)),
        )
    }

    /// Submits the first of the selected files
    pub fn handle_files<P: AsRef<Path>>(&mut self, paths: &[P]) -> Result<u64> {
        let path = paths
            .first()
            .ok_or_else(|| CamXucError::ImageLoad("no file selected".to_string()))?
            .as_ref();

        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                let err = CamXucError::ImageLoad(format!("{}: {e}", path.display()));
                self.display.show_error(err.to_string());
                return Err(err);
            }
        };

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "image".to_string());
        self.handle_drop(DroppedImage { name, bytes })
    }

    /// The single submission path. Returns the sequence number issued.
    pub fn process_image(
        &mut self,
        payload: ImagePayload,
        kind: SubmissionKind,
        source_size: Option<(u32, u32)>,
    ) -> Result<u64> {
        if kind.is_single_shot() && self.pending_single.is_some() {
            warn!("Submission rejected: another single shot is pending");
            return Err(CamXucError::SubmissionPending);
        }

        self.last_seq += 1;
        let seq = self.last_seq;
        if kind.is_single_shot() {
            self.pending_single = Some(seq);
            self.display.loading = true;
        } else {
            self.pending_video = Some(seq);
            self.last_video_seq = seq;
        }
        debug!("Submitting #{} ({:?}, {} bytes)", seq, kind, payload.encoded_len());

        let client = self.client.clone();
        let tx = self.events_tx.clone();
        self.runtime.spawn(async move {
            let outcome = client.process_image(&payload).await;
            let _ = tx.send(ControllerEvent::Classified(Completion {
                seq,
                kind,
                source_size,
                outcome,
            }));
        });
        Ok(seq)
    }

    /// Advances the live session: refreshes the frame, the countdown and the poll timer
    pub fn tick(&mut self, now: Instant) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        match session.camera.frame() {
            Ok(frame) => session.last_frame = Some(frame),
            Err(e) => warn!("Failed to capture frame: {}", e),
        }

        let mut countdown_done = false;
        if let Some(countdown) = session.countdown.as_mut() {
            if now >= countdown.next_step {
                countdown.remaining = countdown.remaining.saturating_sub(1);
                countdown.next_step = now + Duration::from_secs(1);
                countdown_done = countdown.remaining == 0;
                self.display.countdown = Some(countdown.remaining);
            }
        }
        if countdown_done {
            session.countdown = None;
            self.display.countdown = None;
            if let Err(e) = self.take_photo() {
                error!("Photo capture failed: {}", e);
            }
            return;
        }

        let due = session.poll.as_mut().is_some_and(|poll| poll.fire(now));
        if !due {
            return;
        }
        if self.pending_video.is_some() {
            debug!("Skipping poll tick: previous frame still in flight");
            return;
        }
        if let Err(e) = self.submit_video_frame() {
            error!("Error in emotion detection: {}", e);
            self.display.show_error(e.to_string());
        }
    }

    fn submit_video_frame(&mut self) -> Result<u64> {
        let frame = self
            .session
            .as_ref()
            .and_then(|s| s.last_frame.as_ref())
            .ok_or_else(|| CamXucError::FrameProcessing("no frame available".to_string()))?;

        let size = frame.size();
        let payload = ImagePayload::DataUrl(encoder::encode_data_url(
            frame,
            self.settings.video_jpeg_quality,
        )?);
        self.process_image(payload, SubmissionKind::VideoTick, Some(size))
    }

    /// Captures one frame, previews it and submits it; the camera is released afterwards
    fn take_photo(&mut self) -> Result<()> {
        let captured = match self.session.as_mut() {
            Some(session) => session.camera.frame(),
            None => Err(CamXucError::FrameProcessing("camera is not open".to_string())),
        };

        let submitted = captured.and_then(|frame| {
            let payload =
                encoder::jpeg_blob(&frame, self.settings.photo_jpeg_quality, PHOTO_FILE_NAME)?;
            let size = frame.size();
            self.display.set_preview(frame);
            self.process_image(payload, SubmissionKind::Photo, Some(size))
        });

        match submitted {
            Ok(_) => {
                self.release_after_photo = true;
                Ok(())
            }
            Err(e) => {
                self.display.show_error(e.to_string());
                self.display.loading = false;
                self.stop_video_recognition();
                Err(e)
            }
        }
    }

    /// Applies every completion that has arrived; returns how many
    pub fn drain_completions(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.apply(event);
            applied += 1;
        }
        applied
    }

    /// Waits for the next completion and applies it
    pub async fn wait_for_completion(&mut self) -> bool {
        match self.events_rx.recv().await {
            Some(event) => {
                self.apply(event);
                true
            }
            None => false,
        }
    }

    fn apply(&mut self, event: ControllerEvent) {
        match event {
            ControllerEvent::Health(Ok(health)) => {
                info!("Classification service: {:?}", health);
                self.display.show_server_health(&health);
            }
            ControllerEvent::Health(Err(e)) => {
                warn!("Health check failed: {}", e);
                self.display.server = Some(format!("Máy chủ không phản hồi: {e}"));
            }
            ControllerEvent::Classified(completion) => self.apply_completion(completion),
        }
    }

    fn apply_completion(&mut self, completion: Completion) {
        let Completion {
            seq,
            kind,
            source_size,
            outcome,
        } = completion;

        if kind.is_single_shot() {
            if self.pending_single != Some(seq) {
                debug!("Discarding unexpected single-shot result #{}", seq);
                return;
            }
            self.pending_single = None;
            self.display.loading = false;
            if kind == SubmissionKind::Photo && self.release_after_photo {
                self.stop_video_recognition();
            }
        } else {
            if self.pending_video == Some(seq) {
                self.pending_video = None;
            }
            if seq != self.last_video_seq || seq < self.shown_seq {
                debug!(
                    "Discarding stale video result #{} (latest tick #{}, shown #{})",
                    seq, self.last_video_seq, self.shown_seq
                );
                return;
            }
            if !self.is_polling() {
                debug!("Discarding result #{} after recognition stopped", seq);
                return;
            }
        }

        self.shown_seq = seq;

        match outcome {
            Ok(result) => {
                self.update_emotion_display(&result);
                if result.face_coordinates.is_some() {
                    self.display.face_source_size = source_size;
                }
            }
            Err(e) => {
                error!("Error processing image: {}", e);
                self.display.show_error(e.to_string());
            }
        }
    }

    /// Renders one bar per emotion and remembers the face box for the overlay
    pub fn update_emotion_display(&mut self, result: &ClassificationResult) {
        self.display.bars = emotion_bars(result);
        self.display.dominant = result.dominant_emotion.clone();
        self.display.face_box = result.face_coordinates;
        self.display.clear_error();
    }
}

impl Drop for CaptureController {
    fn drop(&mut self) {
        self.stop_video_recognition();
    }
}
