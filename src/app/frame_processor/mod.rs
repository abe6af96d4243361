// SPDX-License-Identifier: MPL-2.0

//! Frame processor module for async frame analysis
//!
//! Samples the live stream on cadences decoupled from rendering and runs
//! inference tasks on it. Results are published as whole-value replacements
//! (latest wins) for the compositor and overlay to read.

pub mod task;
pub mod tasks;
pub mod types;

pub use task::{Cadence, CancelToken, FrameTask, LoopAction, TaskState};
pub use tasks::{FaceLocator, MaskReceiver, PersonSegmenter};
pub use types::{FaceBox, FaceDetections, FrameRegion, SegmentationMask};
