// SPDX-License-Identifier: MPL-2.0

//! Video recording pipeline
//!
//! This module provides an async video recording pipeline that:
//! - Records from the live stream while preview continues
//! - Encodes VP8 through GStreamer and muxes it into WebM
//! - Buffers muxed chunks on a fixed timeslice
//! - Targets a fixed bitrate
//! - Derives a thumbnail by seeking into the finished recording

pub mod encoder;
pub mod muxer;
pub mod recorder;
pub mod thumbnail;

// Re-export commonly used types
pub use encoder::{check_available_encoders, encoder_available};
pub use muxer::is_webm;
pub use recorder::{RecordingConfig, VideoRecorder};
pub use thumbnail::video_thumbnail;
