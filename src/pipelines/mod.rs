// SPDX-License-Identifier: MPL-2.0

//! Processing pipelines for photo and video capture
//!
//! This module provides async processing pipelines that handle media capture
//! without interrupting the live camera preview. All heavy operations run
//! in background tasks so the render loop keeps its cadence.
//!
//! # Pipeline Architecture
//!
//! ```text
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────┐
//! │ Frame (live  │ ──▶ │  Photo Pipeline   │ ──▶ │ JPEG artifact│
//! │ or composite)│     │  - Resize + cap   │     │ + thumbnail  │
//! │              │     │  - Enhance/Filter │     │              │
//! │              │     │  - Encoding       │     │              │
//! └──────────────┘     └───────────────────┘     └──────────────┘
//!
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────┐
//! │ Live Stream  │ ──▶ │  Video Pipeline   │ ──▶ │ WebM (VP8)   │
//! │              │     │  - GStreamer enc  │     │ artifact     │
//! │              │     │  - Chunked output │     │ + thumbnail  │
//! └──────────────┘     └───────────────────┘     └──────────────┘
//! ```
//!
//! # Modules
//!
//! - [`artifact`]: The captured artifact handed to the gallery
//! - [`photo`]: Async photo capture with filters and JPEG encoding
//! - [`video`]: GStreamer video recording

pub mod artifact;
pub mod photo;
pub mod video;

pub use artifact::{ArtifactKind, CapturedArtifact};
