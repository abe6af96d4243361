// SPDX-License-Identifier: MPL-2.0

//! Application core for the AI camera
//!
//! This module wires the live stream, the frame compositor, the inference
//! adapters and the capture pipelines together. There is no UI here; a front
//! end observes the composited surface, the face boxes and the capture
//! events, and calls into the controller and arbiter.
//!
//! # Architecture
//!
//! - `state`: Camera modes and the shared `AppState`
//! - `session`: Stream lifecycle, mode switching, camera flip
//! - `compositor`: Per-tick pass-through or portrait rendering
//! - `frame_processor`: Cancellable loops and the inference adapters
//! - `capture`: Capture lock, photo triggers and recording finalization
//!
//! # Main Types
//!
//! - [`StreamController`]: Owns the stream and every loop reading from it
//! - [`CaptureArbiter`]: Serializes captures into the gallery
//! - [`CameraMode`]: Photo, video, portrait and the other modes

pub mod capture;
pub mod compositor;
pub mod frame_processor;
pub mod session;
pub mod state;

pub use capture::{
    CaptureArbiter, CaptureEvent, CaptureLock, CaptureOperation, FrameSources, TriggerOutcome,
};
pub use compositor::{FrameCompositor, SurfaceReceiver, TickOutcome, spawn_render_loop};
pub use session::StreamController;
pub use state::{AppState, CameraMode, SharedState};
