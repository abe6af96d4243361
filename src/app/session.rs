// SPDX-License-Identifier: GPL-3.0-only

//! Stream lifecycle
//!
//! [`StreamController`] owns the live stream and everything that reads from
//! it continuously: the render loop, the face detection loop and the
//! segmentation push loop. Mode changes and camera flips tear all of these
//! down before new ones start, so a late result from the previous
//! configuration is never published.
//!
//! Capture arbitration lives in [`crate::app::capture`]; the two share the
//! injected [`SharedState`].

use crate::app::capture::FrameSources;
use crate::app::compositor::{FrameCompositor, SurfaceReceiver, spawn_render_loop};
use crate::app::frame_processor::FrameTask;
use crate::app::frame_processor::tasks::{
    FaceLocator, PersonSegmenter, spawn_detection_loop, spawn_segmentation_loop,
};
use crate::app::frame_processor::types::FaceDetections;
use crate::app::state::{CameraMode, SharedState};
use crate::backends::camera::{CameraBackend, FacingMode, LiveStream, StreamRequest, VideoSource};
use crate::backends::inference::ModelRuntime;
use crate::errors::CameraError;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{error, info, warn};

struct FaceFeature {
    locator: FaceLocator,
    task: FrameTask,
}

struct SegmentationFeature {
    segmenter: PersonSegmenter,
    task: FrameTask,
}

/// Owns the live stream, the render loop and the inference loops
pub struct StreamController {
    backend: Arc<dyn CameraBackend>,
    runtime: Arc<dyn ModelRuntime>,
    state: SharedState,
    facing: FacingMode,
    stream: Option<LiveStream>,
    compositor: Arc<Mutex<FrameCompositor>>,
    preview: SurfaceReceiver,
    render_task: Option<FrameTask>,
    face: Option<FaceFeature>,
    segmentation: Option<SegmentationFeature>,
    faces: watch::Sender<FaceDetections>,
}

impl StreamController {
    pub fn new(
        backend: Arc<dyn CameraBackend>,
        runtime: Arc<dyn ModelRuntime>,
        state: SharedState,
    ) -> Self {
        let compositor = FrameCompositor::new();
        let preview = compositor.subscribe();
        let (faces, _) = watch::channel(FaceDetections::default());
        Self {
            backend,
            runtime,
            state,
            facing: FacingMode::default(),
            stream: None,
            compositor: Arc::new(Mutex::new(compositor)),
            preview,
            render_task: None,
            face: None,
            segmentation: None,
            faces,
        }
    }

    /// Start with the given facing mode
    pub fn with_facing(mut self, facing: FacingMode) -> Self {
        self.facing = facing;
        self
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    pub fn facing(&self) -> FacingMode {
        self.facing
    }

    /// Request built from the current mode and settings
    pub fn stream_request(&self) -> StreamRequest {
        let snapshot = self.state.snapshot();
        let (width, height) = snapshot
            .mode
            .target_resolution(snapshot.config.resolution)
            .dimensions();
        StreamRequest::new(self.facing, width, height, snapshot.mode.wants_audio())
    }

    /// Acquire the camera and start rendering
    ///
    /// Any running stream is torn down first. Failure is terminal: the error
    /// is stored in the shared state and nothing is retried.
    pub async fn start(&mut self) -> Result<(), CameraError> {
        self.stop();

        let request = self.stream_request();
        info!(
            backend = self.backend.name(),
            facing = ?request.facing_mode,
            width = request.ideal_width,
            height = request.ideal_height,
            audio = request.audio,
            "Starting camera stream"
        );

        let stream = match self.backend.open(request).await {
            Ok(stream) => stream,
            Err(e) => {
                error!(error = %e, "Camera stream failed");
                self.state.set_error(Some(e.clone()));
                return Err(e);
            }
        };
        self.state.set_error(None);

        let source: Arc<dyn VideoSource> = Arc::new(stream.clone());
        self.render_task = Some(spawn_render_loop(Arc::clone(&self.compositor), source));
        self.stream = Some(stream);

        self.apply_features().await;
        Ok(())
    }

    /// Switch camera mode, restarting the stream
    pub async fn set_mode(&mut self, mode: CameraMode) -> Result<(), CameraError> {
        if mode == self.state.mode() && self.is_running() {
            return Ok(());
        }
        self.state.set_mode(mode);
        self.start().await
    }

    /// Switch between front and rear camera
    pub async fn flip_camera(&mut self) -> Result<(), CameraError> {
        self.facing = self.facing.flipped();
        info!(facing = ?self.facing, "Flipping camera");
        self.start().await
    }

    /// Toggle face detection in the settings and apply it
    pub async fn set_face_detection(&mut self, enabled: bool) {
        self.state.update(|s| s.config.ai_face_detection = enabled);
        if self.is_running() {
            self.apply_features().await;
        }
    }

    /// Restart inference features for the current mode and settings
    pub async fn apply_features(&mut self) {
        self.stop_features();
        let Some(stream) = self.stream.clone() else {
            return;
        };
        let snapshot = self.state.snapshot();
        let source: Arc<dyn VideoSource> = Arc::new(stream);

        if snapshot.mode.is_portrait() {
            let segmenter = PersonSegmenter::initialize(self.runtime.as_ref()).await;
            let masks = segmenter.as_ref().map(|s| s.subscribe());
            self.with_compositor(|c| c.set_portrait(true, masks));

            if let Some(segmenter) = segmenter {
                let task = spawn_segmentation_loop(segmenter.clone(), source);
                self.segmentation = Some(SegmentationFeature { segmenter, task });
            }
            return;
        }

        self.with_compositor(|c| c.set_portrait(false, None));
        if snapshot.config.ai_face_detection
            && let Some(locator) = FaceLocator::initialize(self.runtime.as_ref()).await
        {
            let task = spawn_detection_loop(locator.clone(), source, self.faces.clone());
            self.face = Some(FaceFeature { locator, task });
        }
    }

    /// Cancel inference loops and release their models
    fn stop_features(&mut self) {
        if let Some(mut feature) = self.segmentation.take() {
            feature.task.cancel();
            feature.segmenter.teardown();
        }
        if let Some(mut feature) = self.face.take() {
            feature.task.cancel();
            feature.locator.teardown();
        }
        self.faces.send_replace(FaceDetections::default());
        self.with_compositor(|c| c.set_portrait(false, None));
    }

    /// Tear down everything and release the camera
    pub fn stop(&mut self) {
        self.stop_features();
        if let Some(mut task) = self.render_task.take() {
            task.cancel();
        }
        if let Some(stream) = self.stream.take() {
            stream.stop();
        }
    }

    fn with_compositor(&self, f: impl FnOnce(&mut FrameCompositor)) {
        match self.compositor.lock() {
            Ok(mut compositor) => f(&mut compositor),
            Err(_) => warn!("Compositor lock poisoned"),
        }
    }

    pub fn is_running(&self) -> bool {
        self.stream.as_ref().is_some_and(|s| !s.is_stopped())
    }

    pub fn stream(&self) -> Option<&LiveStream> {
        self.stream.as_ref()
    }

    /// Latest face boxes, for the overlay
    pub fn faces(&self) -> watch::Receiver<FaceDetections> {
        self.faces.subscribe()
    }

    /// Composited output, for the display
    pub fn preview(&self) -> SurfaceReceiver {
        self.preview.clone()
    }

    /// Shared compositor, e.g. for stats
    pub fn compositor(&self) -> Arc<Mutex<FrameCompositor>> {
        Arc::clone(&self.compositor)
    }

    /// Frame sources for a still capture
    pub fn frame_sources(&self) -> Option<FrameSources> {
        Some(FrameSources {
            stream: self.stream.clone()?,
            surface: self.preview.clone(),
        })
    }

    pub fn face_detection_active(&self) -> bool {
        self.face.is_some()
    }

    pub fn segmentation_active(&self) -> bool {
        self.segmentation.is_some()
    }
}

impl Drop for StreamController {
    fn drop(&mut self) {
        self.stop();
    }
}
