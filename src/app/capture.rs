// SPDX-License-Identifier: GPL-3.0-only

//! Capture arbitration
//!
//! Runs still captures and recording finalization one at a time. The
//! capture-in-progress lock is checked and taken synchronously when a
//! trigger arrives; a trigger that finds it held is ignored, never queued.

use crate::app::compositor::SurfaceReceiver;
use crate::app::state::SharedState;
use crate::backends::camera::{Frame, LiveStream, VideoSource};
use crate::constants::CAPTURE_EVENT_CAPACITY;
use crate::errors::{AppError, PhotoError, RecordingError};
use crate::pipelines::photo::{CaptureSource, PhotoPipeline, PostProcessingConfig};
use crate::pipelines::video::{RecordingConfig, VideoRecorder};
use crate::storage::GallerySink;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Operation a [`CaptureEvent::Failed`] refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOperation {
    Photo,
    Recording,
}

/// Notifications for the UI
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureEvent {
    /// Photo trigger accepted; fires before any timer delay
    ShutterFlash,
    PhotoSaved { id: Uuid },
    RecordingStarted,
    RecordingSaved { id: Uuid, has_thumbnail: bool },
    /// Nothing was added to the gallery; the user may retry
    Failed {
        operation: CaptureOperation,
        message: String,
    },
}

/// What happened to a trigger
#[derive(Debug)]
pub enum TriggerOutcome {
    /// Work started; the handle resolves when it is done
    Started(JoinHandle<()>),
    /// Another operation holds the lock, or there was nothing to do
    Ignored,
}

impl TriggerOutcome {
    pub fn is_started(&self) -> bool {
        matches!(self, TriggerOutcome::Started(_))
    }

    /// Wait for the started work, if any
    pub async fn wait(self) {
        if let TriggerOutcome::Started(handle) = self {
            if let Err(e) = handle.await {
                warn!(error = %e, "Capture task ended abnormally");
            }
        }
    }
}

/// The capture-in-progress flag
#[derive(Debug, Clone, Default)]
pub struct CaptureLock(Arc<AtomicBool>);

impl CaptureLock {
    /// Take the lock, or `None` if it is held
    pub fn try_acquire(&self) -> Option<CaptureGuard> {
        self.0
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| CaptureGuard(Arc::clone(&self.0)))
    }

    pub fn is_held(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Releases the capture lock on drop
#[derive(Debug)]
pub struct CaptureGuard(Arc<AtomicBool>);

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Where a still capture reads its frame from
#[derive(Debug, Clone)]
pub struct FrameSources {
    pub stream: LiveStream,
    /// Composited display output
    pub surface: SurfaceReceiver,
}

impl FrameSources {
    /// Pick the frame to capture
    ///
    /// Portrait captures the composited surface when it has content,
    /// otherwise the live frame is used.
    pub fn grab(&self, portrait: bool) -> Option<(Arc<Frame>, CaptureSource)> {
        if portrait {
            let composited = self.surface.borrow().clone();
            if let Some(frame) = composited.filter(|f| f.width > 0 && f.height > 0) {
                return Some((frame, CaptureSource::Composited));
            }
        }
        self.stream
            .current_frame()
            .map(|frame| (frame, CaptureSource::LiveFrame))
    }
}

/// Serializes photo captures and recording finalization
pub struct CaptureArbiter {
    state: SharedState,
    gallery: Arc<dyn GallerySink>,
    lock: CaptureLock,
    events: broadcast::Sender<CaptureEvent>,
    recorder: Mutex<Option<VideoRecorder>>,
    recording_config: RecordingConfig,
}

impl CaptureArbiter {
    pub fn new(state: SharedState, gallery: Arc<dyn GallerySink>) -> Self {
        let (events, _) = broadcast::channel(CAPTURE_EVENT_CAPACITY);
        Self {
            state,
            gallery,
            lock: CaptureLock::default(),
            events,
            recorder: Mutex::new(None),
            recording_config: RecordingConfig::default(),
        }
    }

    pub fn with_recording_config(mut self, config: RecordingConfig) -> Self {
        self.recording_config = config;
        self
    }

    /// Receiver for capture events
    pub fn subscribe(&self) -> broadcast::Receiver<CaptureEvent> {
        self.events.subscribe()
    }

    /// Whether a capture or finalize is in flight
    pub fn is_capturing(&self) -> bool {
        self.lock.is_held()
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.lock().map(|r| r.is_some()).unwrap_or(false)
    }

    fn emit(&self, event: CaptureEvent) {
        emit(&self.events, event);
    }

    /// Take a photo
    ///
    /// Settings are read now. The shutter flash fires immediately; the frame
    /// is grabbed after the configured timer delay.
    pub fn trigger_photo(&self, sources: FrameSources) -> TriggerOutcome {
        let Some(guard) = self.lock.try_acquire() else {
            debug!("Capture already in progress, ignoring trigger");
            return TriggerOutcome::Ignored;
        };

        let snapshot = self.state.snapshot();
        let mode = snapshot.mode;
        let config = snapshot.config;
        let delay = config.timer.delay();
        let (target_width, target_height) = mode.target_resolution(config.resolution).dimensions();
        let pipeline = PhotoPipeline::with_config(PostProcessingConfig {
            filter_type: config.filter,
            enhance: config.ai_enhance,
            target_width,
            target_height,
        });

        info!(%mode, filter = %config.filter, timer_secs = delay.as_secs(), "Photo capture triggered");
        self.emit(CaptureEvent::ShutterFlash);

        let gallery = Arc::clone(&self.gallery);
        let events = self.events.clone();
        let handle = tokio::spawn(async move {
            let _guard = guard;
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let Some((frame, source)) = sources.grab(mode.is_portrait()) else {
                warn!("No frame available for capture");
                emit(
                    &events,
                    failed(CaptureOperation::Photo, PhotoError::NoFrameAvailable.into()),
                );
                return;
            };

            let result = async {
                let artifact = pipeline.capture(frame, source).await?;
                let id = artifact.id;
                gallery.append(artifact).await?;
                Ok::<_, AppError>(id)
            }
            .await;

            match result {
                Ok(id) => {
                    info!(%id, "Photo saved");
                    emit(&events, CaptureEvent::PhotoSaved { id });
                }
                Err(e) => {
                    error!(error = %e, "Photo capture failed");
                    emit(&events, failed(CaptureOperation::Photo, e));
                }
            }
        });

        TriggerOutcome::Started(handle)
    }

    /// Start recording `stream`
    ///
    /// Returns `Ok(false)` when a recording is already running.
    pub fn start_recording(&self, stream: &LiveStream) -> Result<bool, RecordingError> {
        let mut recorder = self
            .recorder
            .lock()
            .map_err(|_| RecordingError::StartFailed("recorder lock poisoned".to_string()))?;
        if recorder.is_some() {
            debug!("Recording already active, ignoring start");
            return Ok(false);
        }

        *recorder = Some(VideoRecorder::start(stream, self.recording_config)?);
        self.emit(CaptureEvent::RecordingStarted);
        Ok(true)
    }

    /// Stop the running recording and add it to the gallery
    ///
    /// Ignored when nothing is recording or another capture holds the lock;
    /// in the latter case the recording keeps running.
    pub fn stop_recording(&self) -> TriggerOutcome {
        let Some(guard) = self.lock.try_acquire() else {
            debug!("Capture in progress, ignoring stop");
            return TriggerOutcome::Ignored;
        };
        let recorder = match self.recorder.lock() {
            Ok(mut recorder) => recorder.take(),
            Err(_) => None,
        };
        let Some(recorder) = recorder else {
            debug!("No active recording");
            return TriggerOutcome::Ignored;
        };

        let gallery = Arc::clone(&self.gallery);
        let events = self.events.clone();
        let handle = tokio::spawn(async move {
            let _guard = guard;
            let result = async {
                let artifact = recorder.stop().await?;
                let id = artifact.id;
                let has_thumbnail = artifact.thumbnail.is_some();
                gallery.append(artifact).await?;
                Ok::<_, AppError>((id, has_thumbnail))
            }
            .await;

            match result {
                Ok((id, has_thumbnail)) => {
                    info!(%id, has_thumbnail, "Recording saved");
                    emit(&events, CaptureEvent::RecordingSaved { id, has_thumbnail });
                }
                Err(e) => {
                    error!(error = %e, "Recording finalize failed");
                    emit(&events, failed(CaptureOperation::Recording, e));
                }
            }
        });

        TriggerOutcome::Started(handle)
    }
}

fn failed(operation: CaptureOperation, error: AppError) -> CaptureEvent {
    CaptureEvent::Failed {
        operation,
        message: error.to_string(),
    }
}

fn emit(events: &broadcast::Sender<CaptureEvent>, event: CaptureEvent) {
    // No subscribers is fine
    let _ = events.send(event);
}
