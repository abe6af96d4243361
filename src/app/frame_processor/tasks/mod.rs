// SPDX-License-Identifier: GPL-3.0-only

//! Frame processing tasks
//!
//! Inference adapters that analyze live frames off the render path:
//! face detection for the overlay and person segmentation for portrait
//! compositing.

pub mod face_detector;
pub mod segmenter;

pub use face_detector::{FaceLocator, spawn_detection_loop};
pub use segmenter::{MaskReceiver, PersonSegmenter, spawn_segmentation_loop};
