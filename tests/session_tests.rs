// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the stream controller and capture arbiter

use aicam::app::{
    AppState, CameraMode, CaptureArbiter, CaptureEvent, CaptureOperation, FrameSources,
    SharedState, StreamController,
};
use aicam::backends::camera::{
    CameraBackend, FacingMode, Frame, LiveStream, StreamRequest, stream_channel,
};
use aicam::backends::inference::{
    InferenceModel, InferenceOutput, MaskValues, ModelOptions, ModelRuntime, NoRuntime, RawBox,
    RawMask,
};
use aicam::backends::virtual_camera::UnavailableBackend;
use aicam::config::{CaptureTimer, Config};
use aicam::errors::{CameraError, InferenceError};
use aicam::pipelines::ArtifactKind;
use aicam::pipelines::video::{RecordingConfig, encoder_available, is_webm};
use aicam::storage::{GallerySink, MemoryGallery};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{broadcast, watch};

/// Publishes solid frames of a fixed size every 33 ms
struct FixedSizeBackend {
    width: u32,
    height: u32,
}

impl FixedSizeBackend {
    fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl CameraBackend for FixedSizeBackend {
    fn name(&self) -> &str {
        "fixed-size"
    }

    fn open(&self, request: StreamRequest) -> BoxFuture<'_, Result<LiveStream, CameraError>> {
        let (width, height) = (self.width, self.height);
        Box::pin(async move {
            let (sender, stream) = stream_channel(request);
            let handle = tokio::spawn(async move {
                let mut ticker = tokio::time::interval(Duration::from_millis(33));
                loop {
                    ticker.tick().await;
                    if !sender.send(Frame::solid(width, height, [120, 80, 40, 255])) {
                        break;
                    }
                }
            });
            stream.attach_producer(handle);
            Ok(stream)
        })
    }
}

#[derive(Clone, Copy)]
enum MaskSize {
    MatchFrame,
    Fixed(u32, u32),
}

/// Scripted model runtime with call counters
#[derive(Clone, Default)]
struct ScriptedRuntime {
    face_delay: Duration,
    mask: Option<MaskSize>,
    face_calls: Arc<AtomicUsize>,
    mask_calls: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

struct FaceModel {
    delay: Duration,
    calls: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

impl InferenceModel for FaceModel {
    fn infer(&self, _frame: Arc<Frame>) -> BoxFuture<'_, Result<InferenceOutput, InferenceError>> {
        Box::pin(async move {
            tokio::time::sleep(self.delay).await;
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(InferenceOutput::Boxes(vec![RawBox {
                x_min: 4.0,
                y_min: 4.0,
                width: 10.0,
                height: 10.0,
                score: Some(0.9),
            }]))
        })
    }

    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

struct MaskModel {
    size: MaskSize,
    calls: Arc<AtomicUsize>,
}

impl InferenceModel for MaskModel {
    fn infer(&self, frame: Arc<Frame>) -> BoxFuture<'_, Result<InferenceOutput, InferenceError>> {
        let (width, height) = match self.size {
            MaskSize::MatchFrame => frame.dimensions(),
            MaskSize::Fixed(w, h) => (w, h),
        };
        self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            Ok(InferenceOutput::Mask(RawMask {
                width,
                height,
                values: MaskValues::Confidence(vec![0.9; (width * height) as usize]),
            }))
        })
    }
}

impl ModelRuntime for ScriptedRuntime {
    fn name(&self) -> &str {
        "scripted"
    }

    fn initialize(
        &self,
        options: ModelOptions,
    ) -> BoxFuture<'_, Result<Arc<dyn InferenceModel>, InferenceError>> {
        Box::pin(async move {
            match options {
                ModelOptions::FaceDetection { .. } => Ok(Arc::new(FaceModel {
                    delay: self.face_delay,
                    calls: Arc::clone(&self.face_calls),
                    closes: Arc::clone(&self.closes),
                }) as Arc<dyn InferenceModel>),
                ModelOptions::Segmentation { .. } => match self.mask {
                    Some(size) => Ok(Arc::new(MaskModel {
                        size,
                        calls: Arc::clone(&self.mask_calls),
                    }) as Arc<dyn InferenceModel>),
                    None => Err(InferenceError::InitializationFailed(
                        "no segmentation model".to_string(),
                    )),
                },
            }
        })
    }
}

fn shared_state(mode: CameraMode) -> SharedState {
    let state = SharedState::new(AppState::new(Config::default()));
    state.set_mode(mode);
    state
}

fn controller(
    backend: impl CameraBackend + 'static,
    runtime: impl ModelRuntime + 'static,
    state: SharedState,
) -> StreamController {
    StreamController::new(Arc::new(backend), Arc::new(runtime), state)
}

fn drain(rx: &mut broadcast::Receiver<CaptureEvent>) -> Vec<CaptureEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn sources_with_frame(frame: Option<Frame>) -> FrameSources {
    let (tx, stream) = stream_channel(StreamRequest::default());
    if let Some(frame) = frame {
        tx.send(frame);
    }
    let (_surface_tx, surface) = watch::channel(None);
    FrameSources { stream, surface }
}

#[tokio::test(start_paused = true)]
async fn test_camera_failure_sets_error_state() {
    let state = shared_state(CameraMode::Photo);
    let mut controller = controller(
        UnavailableBackend::new(CameraError::PermissionDenied),
        NoRuntime,
        state.clone(),
    );

    let err = controller.start().await.unwrap_err();
    assert_eq!(err, CameraError::PermissionDenied);
    assert_eq!(state.error(), Some(CameraError::PermissionDenied));
    assert!(!controller.is_running());
    assert!(controller.frame_sources().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_successful_start_clears_error() {
    let state = shared_state(CameraMode::Photo);
    state.set_error(Some(CameraError::Disconnected));
    let mut controller = controller(FixedSizeBackend::new(32, 18), NoRuntime, state.clone());

    controller.start().await.unwrap();
    assert_eq!(state.error(), None);
    assert!(controller.is_running());
}

#[tokio::test(start_paused = true)]
async fn test_portrait_without_runtime_is_pass_through() {
    let state = shared_state(CameraMode::Portrait);
    let mut controller = controller(FixedSizeBackend::new(64, 36), NoRuntime, state);
    controller.start().await.unwrap();

    tokio::time::sleep(Duration::from_millis(300)).await;

    assert!(!controller.segmentation_active());
    assert!(!controller.face_detection_active());
    let compositor = controller.compositor();
    let compositor = compositor.lock().unwrap();
    assert!(compositor.is_portrait());
    let stats = compositor.stats();
    assert!(stats.pass_through > 0);
    assert_eq!(stats.portrait, 0);
    assert_eq!(stats.failed, 0);
}

#[tokio::test(start_paused = true)]
async fn test_mismatched_mask_renders_pass_through() {
    let runtime = ScriptedRuntime {
        mask: Some(MaskSize::Fixed(640, 360)),
        ..ScriptedRuntime::default()
    };
    let mask_calls = Arc::clone(&runtime.mask_calls);
    let state = shared_state(CameraMode::Portrait);
    let mut controller = controller(FixedSizeBackend::new(1280, 720), runtime, state);
    controller.start().await.unwrap();

    tokio::time::sleep(Duration::from_millis(500)).await;

    assert!(controller.segmentation_active());
    assert!(mask_calls.load(Ordering::SeqCst) > 0);
    let stats = controller.compositor().lock().unwrap().stats();
    assert!(stats.pass_through > 0);
    assert_eq!(stats.portrait, 0);
}

#[tokio::test(start_paused = true)]
async fn test_matching_mask_renders_portrait() {
    let runtime = ScriptedRuntime {
        mask: Some(MaskSize::MatchFrame),
        ..ScriptedRuntime::default()
    };
    let state = shared_state(CameraMode::Portrait);
    let mut controller = controller(FixedSizeBackend::new(64, 36), runtime, state);
    controller.start().await.unwrap();

    tokio::time::sleep(Duration::from_millis(500)).await;

    let stats = controller.compositor().lock().unwrap().stats();
    assert!(stats.portrait > 0, "{:?}", stats);
}

#[tokio::test(start_paused = true)]
async fn test_face_boxes_published() {
    let runtime = ScriptedRuntime::default();
    let state = shared_state(CameraMode::Photo);
    let mut controller = controller(FixedSizeBackend::new(64, 36), runtime, state);
    controller.start().await.unwrap();
    assert!(controller.face_detection_active());

    let mut faces = controller.faces();
    tokio::time::sleep(Duration::from_millis(200)).await;
    let detections = faces.borrow_and_update().clone();
    assert_eq!(detections.boxes.len(), 1);
    assert_eq!((detections.frame_width, detections.frame_height), (64, 36));
}

#[tokio::test(start_paused = true)]
async fn test_face_detection_follows_setting() {
    let runtime = ScriptedRuntime::default();
    let state = shared_state(CameraMode::Photo);
    let mut controller = controller(FixedSizeBackend::new(64, 36), runtime, state.clone());
    controller.start().await.unwrap();

    controller.set_face_detection(false).await;
    assert!(!state.config().ai_face_detection);
    assert!(!controller.face_detection_active());

    controller.set_face_detection(true).await;
    assert!(controller.face_detection_active());
}

#[tokio::test(start_paused = true)]
async fn test_mode_switch_drops_in_flight_face_result() {
    let runtime = ScriptedRuntime {
        face_delay: Duration::from_millis(200),
        ..ScriptedRuntime::default()
    };
    let face_calls = Arc::clone(&runtime.face_calls);
    let closes = Arc::clone(&runtime.closes);
    let state = shared_state(CameraMode::Photo);
    let mut controller = controller(FixedSizeBackend::new(64, 36), runtime, state);
    controller.start().await.unwrap();

    // First inference is now in flight
    tokio::time::sleep(Duration::from_millis(50)).await;
    controller.set_mode(CameraMode::Portrait).await.unwrap();
    assert!(!controller.face_detection_active());
    assert_eq!(closes.load(Ordering::SeqCst), 1);

    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert!(controller.faces().borrow().boxes.is_empty());
    assert_eq!(face_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_mode_drives_stream_request() {
    let state = shared_state(CameraMode::Photo);
    let mut controller = controller(FixedSizeBackend::new(32, 18), NoRuntime, state);
    controller.start().await.unwrap();
    assert!(!controller.stream().unwrap().request().audio);

    controller.set_mode(CameraMode::Video).await.unwrap();
    assert!(controller.stream().unwrap().request().audio);

    controller.set_mode(CameraMode::Ultra).await.unwrap();
    let request = controller.stream().unwrap().request();
    assert!(!request.audio);
    assert_eq!((request.ideal_width, request.ideal_height), (1920, 1080));
}

#[tokio::test(start_paused = true)]
async fn test_flip_restarts_stream() {
    let state = shared_state(CameraMode::Photo);
    let mut controller = controller(FixedSizeBackend::new(32, 18), NoRuntime, state);
    controller.start().await.unwrap();
    let old = controller.stream().unwrap().clone();

    controller.flip_camera().await.unwrap();

    assert!(old.is_stopped());
    assert!(controller.is_running());
    assert_eq!(controller.facing(), FacingMode::User);
    assert_eq!(
        controller.stream().unwrap().request().facing_mode,
        FacingMode::User
    );
}

#[tokio::test]
async fn test_rapid_triggers_produce_one_photo() {
    let gallery = Arc::new(MemoryGallery::new());
    let arbiter = CaptureArbiter::new(shared_state(CameraMode::Photo), gallery.clone());
    let mut events = arbiter.subscribe();
    let sources = sources_with_frame(Some(Frame::solid(320, 240, [1, 2, 3, 255])));

    let first = arbiter.trigger_photo(sources.clone());
    let second = arbiter.trigger_photo(sources.clone());
    assert!(first.is_started());
    assert!(!second.is_started());
    assert!(arbiter.is_capturing());

    first.wait().await;
    assert!(!arbiter.is_capturing());
    assert_eq!(gallery.len(), 1);

    let events = drain(&mut events);
    assert_eq!(events.len(), 2);
    assert_eq!(events[0], CaptureEvent::ShutterFlash);
    assert!(matches!(events[1], CaptureEvent::PhotoSaved { .. }));

    // Lock is free again
    let third = arbiter.trigger_photo(sources);
    assert!(third.is_started());
    third.wait().await;
    assert_eq!(gallery.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_shutter_flash_precedes_timer_delay() {
    let state = shared_state(CameraMode::Photo);
    state.update(|s| s.config.timer = CaptureTimer::ThreeSeconds);
    let gallery = Arc::new(MemoryGallery::new());
    let arbiter = CaptureArbiter::new(state, gallery.clone());
    let mut events = arbiter.subscribe();
    let sources = sources_with_frame(Some(Frame::solid(64, 48, [1, 2, 3, 255])));

    let start = tokio::time::Instant::now();
    let outcome = arbiter.trigger_photo(sources);
    assert_eq!(events.try_recv().unwrap(), CaptureEvent::ShutterFlash);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(events.try_recv().is_err());
    assert!(gallery.is_empty());
    assert!(arbiter.is_capturing());

    outcome.wait().await;
    assert!(start.elapsed() >= Duration::from_secs(3));
    assert!(matches!(
        events.try_recv().unwrap(),
        CaptureEvent::PhotoSaved { .. }
    ));
    assert_eq!(gallery.len(), 1);
}

#[tokio::test]
async fn test_portrait_captures_composited_surface() {
    let gallery = Arc::new(MemoryGallery::new());
    let arbiter = CaptureArbiter::new(shared_state(CameraMode::Portrait), gallery.clone());

    let (tx, stream) = stream_channel(StreamRequest::default());
    tx.send(Frame::solid(640, 480, [1, 2, 3, 255]));
    let (_surface_tx, surface) =
        watch::channel(Some(Arc::new(Frame::solid(1600, 900, [4, 5, 6, 255]))));
    let sources = FrameSources { stream, surface };

    arbiter.trigger_photo(sources.clone()).wait().await;
    let artifact = gallery.latest_photo().unwrap();
    assert_eq!((artifact.width, artifact.height), (1600, 900));

    // Outside portrait the live frame is used
    let arbiter = CaptureArbiter::new(shared_state(CameraMode::Photo), gallery.clone());
    arbiter.trigger_photo(sources).wait().await;
    let artifact = gallery.latest_photo().unwrap();
    assert_eq!((artifact.width, artifact.height), (640, 480));
}

#[tokio::test]
async fn test_capture_without_frame_reports_failure() {
    let gallery = Arc::new(MemoryGallery::new());
    let arbiter = CaptureArbiter::new(shared_state(CameraMode::Photo), gallery.clone());
    let mut events = arbiter.subscribe();

    arbiter.trigger_photo(sources_with_frame(None)).wait().await;

    assert!(gallery.is_empty());
    assert!(!arbiter.is_capturing());
    let events = drain(&mut events);
    assert!(matches!(
        events.last(),
        Some(CaptureEvent::Failed {
            operation: CaptureOperation::Photo,
            ..
        })
    ));
}

#[tokio::test]
async fn test_recording_round_trip() {
    if !encoder_available() {
        eprintln!("GStreamer VP8/WebM plugins not installed, skipping");
        return;
    }
    let gallery = Arc::new(MemoryGallery::new());
    let state = shared_state(CameraMode::Video);
    // Several timeslices per recording
    let arbiter = CaptureArbiter::new(state.clone(), gallery.clone()).with_recording_config(
        RecordingConfig {
            timeslice: Duration::from_millis(200),
            ..RecordingConfig::default()
        },
    );
    let mut events = arbiter.subscribe();

    let mut controller = controller(FixedSizeBackend::new(64, 48), NoRuntime, state);
    controller.start().await.unwrap();
    let stream = controller.stream().unwrap().clone();

    assert!(arbiter.start_recording(&stream).unwrap());
    assert!(!arbiter.start_recording(&stream).unwrap());
    assert!(arbiter.is_recording());

    tokio::time::sleep(Duration::from_millis(700)).await;

    let finalize = arbiter.stop_recording();
    assert!(finalize.is_started());
    // Finalize holds the capture lock
    let sources = controller.frame_sources().unwrap();
    assert!(!arbiter.trigger_photo(sources).is_started());
    finalize.wait().await;

    assert!(!arbiter.is_recording());
    assert!(!arbiter.stop_recording().is_started());
    let items = gallery.items();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].kind, ArtifactKind::Video);
    assert!(is_webm(&items[0].data));

    let events = drain(&mut events);
    assert_eq!(events[0], CaptureEvent::RecordingStarted);
    assert!(matches!(
        events.last(),
        Some(CaptureEvent::RecordingSaved {
            has_thumbnail: true,
            ..
        })
    ));
}
