// SPDX-License-Identifier: MPL-2.0

//! Media processing utilities for pixel transforms and encoding
//!
//! This module provides the CPU-side media operations used by the
//! compositor and the capture pipelines:
//!
//! # Color Filters
//!
//! The [`filters`] module holds the per-pixel color filters and the global
//! auto-enhance correction. Both work in place on interleaved 8-bit buffers.
//!
//! # Portrait Compositing
//!
//! The [`portrait`] module blurs a frame and mattes the sharp foreground back
//! over it using a segmentation mask.
//!
//! # Encoding
//!
//! - [`jpeg`]: JPEG encode/decode shared by photos and recordings
//! - [`thumbnail`]: Aspect-preserving gallery thumbnails

pub mod filters;
pub mod jpeg;
pub mod portrait;
pub mod thumbnail;

// Re-export commonly used types
pub use filters::{FilterType, apply_filter, auto_enhance};
pub use portrait::composite_portrait;
pub use thumbnail::{Thumbnail, create_thumbnail, thumbnail_dimensions};
