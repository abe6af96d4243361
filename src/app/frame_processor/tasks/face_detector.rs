// SPDX-License-Identifier: GPL-3.0-only

//! Face detection task
//!
//! Wraps a face model from the configured [`ModelRuntime`]. Detection is
//! best-effort: any failure (model error, wrong output kind, garbage boxes)
//! yields an empty list for that frame.
//!
//! The detection loop is self-rescheduling: it analyzes the newest frame,
//! publishes the boxes, then schedules the next pass. Its cadence is
//! independent of the render loop.

use crate::app::frame_processor::task::{Cadence, FrameTask, LoopAction};
use crate::app::frame_processor::types::{FaceBox, FaceDetections};
use crate::backends::camera::{Frame, VideoSource};
use crate::backends::inference::{InferenceModel, InferenceOutput, ModelOptions, ModelRuntime};
use crate::constants::{FACE_DETECTION_PERIOD, MAX_FACES};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

/// Face locator backed by an inference model
#[derive(Clone)]
pub struct FaceLocator {
    model: Arc<dyn InferenceModel>,
    max_faces: usize,
    closed: Arc<AtomicBool>,
}

impl FaceLocator {
    /// Load the face model
    ///
    /// Returns `None` when the runtime cannot provide one; face detection is
    /// then simply unavailable.
    pub async fn initialize(runtime: &dyn ModelRuntime) -> Option<Self> {
        let options = ModelOptions::face_detection();
        let max_faces = match options {
            ModelOptions::FaceDetection { max_faces, .. } => max_faces,
            _ => MAX_FACES,
        };

        match runtime.initialize(options).await {
            Ok(model) => {
                info!(runtime = runtime.name(), max_faces, "Face detection ready");
                Some(Self::from_model(model, max_faces))
            }
            Err(e) => {
                warn!(runtime = runtime.name(), error = %e, "Face detection unavailable");
                None
            }
        }
    }

    /// Wrap an already loaded model
    pub fn from_model(model: Arc<dyn InferenceModel>, max_faces: usize) -> Self {
        Self {
            model,
            max_faces,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Locate faces in one frame
    pub async fn locate(&self, frame: Arc<Frame>) -> Vec<FaceBox> {
        if self.is_closed() {
            return Vec::new();
        }
        let (width, height) = frame.dimensions();

        let output = match self.model.infer(frame).await {
            Ok(output) => output,
            Err(e) => {
                debug!(error = %e, "Face detection failed");
                return Vec::new();
            }
        };

        let raw_boxes = match output {
            InferenceOutput::Boxes(boxes) => boxes,
            other => {
                warn!(kind = other.kind(), "Face model returned unexpected output");
                return Vec::new();
            }
        };

        let total = raw_boxes.len();
        let boxes: Vec<FaceBox> = raw_boxes
            .iter()
            .filter_map(|raw| FaceBox::from_raw(raw, width, height))
            .take(self.max_faces)
            .collect();

        if boxes.len() < total.min(self.max_faces) {
            debug!(
                kept = boxes.len(),
                total, "Dropped invalid face boxes from model output"
            );
        }
        trace!(count = boxes.len(), "Faces located");
        boxes
    }

    /// Release the model; later calls to [`Self::locate`] return nothing
    pub fn teardown(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.model.close();
            info!("Face detection torn down");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Start the self-rescheduling detection loop
///
/// Each pass reads the newest frame from `source`, locates faces, and
/// publishes the result to `output` unless the task was cancelled while
/// inference was in flight. Frames already analyzed are skipped.
pub fn spawn_detection_loop(
    locator: FaceLocator,
    source: Arc<dyn VideoSource>,
    output: watch::Sender<FaceDetections>,
) -> FrameTask {
    let last_sequence = Arc::new(std::sync::atomic::AtomicU64::new(0));

    FrameTask::spawn(
        "face-detection",
        Cadence::AfterCompletion(FACE_DETECTION_PERIOD),
        move |token| {
            let locator = locator.clone();
            let source = Arc::clone(&source);
            let output = output.clone();
            let last_sequence = Arc::clone(&last_sequence);

            async move {
                if locator.is_closed() {
                    return LoopAction::Stop;
                }
                let Some(frame) = source.current_frame() else {
                    return LoopAction::Continue;
                };
                if !frame.is_valid() || frame.sequence == last_sequence.load(Ordering::Relaxed) {
                    return LoopAction::Continue;
                }
                last_sequence.store(frame.sequence, Ordering::Relaxed);

                let (frame_width, frame_height) = frame.dimensions();
                let frame_sequence = frame.sequence;
                let boxes = locator.locate(frame).await;

                // Checked under the channel lock so a concurrent stop cannot
                // be overwritten by a late result
                let published = output.send_if_modified(|current| {
                    if token.is_cancelled() {
                        return false;
                    }
                    *current = FaceDetections {
                        boxes,
                        frame_width,
                        frame_height,
                        frame_sequence,
                    };
                    true
                });
                if !published {
                    debug!("Dropping face detections from cancelled task");
                    return LoopAction::Stop;
                }
                LoopAction::Continue
            }
        },
    )
}
