// SPDX-License-Identifier: MPL-2.0

//! Async post-processing pipeline for photos
//!
//! This module turns a captured frame into the final RGBA image:
//! - Resize to the capture size (requested resolution, capped)
//! - Auto-enhance (optional)
//! - Color filter
//!
//! Enhance always runs before the filter: it renormalizes global brightness,
//! which the filter then stylizes.

use crate::backends::camera::Frame;
use crate::constants::cap_dimensions;
use crate::errors::PhotoError;
use crate::media::filters::{FilterType, apply_filter, auto_enhance};
use image::RgbaImage;
use image::imageops::{self, FilterType as ResizeFilter};
use std::sync::Arc;
use tracing::{debug, info};

/// Where the capture frame came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureSource {
    /// The live camera frame; sized to `min(frame, requested)`
    LiveFrame,
    /// The composited display surface; captured at its own size
    Composited,
}

/// Post-processing configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostProcessingConfig {
    /// Filter type to apply
    pub filter_type: FilterType,
    /// Run auto-enhance before the filter
    pub enhance: bool,
    /// Requested output size (before the capture cap)
    pub target_width: u32,
    pub target_height: u32,
}

impl Default for PostProcessingConfig {
    fn default() -> Self {
        let (target_width, target_height) = crate::constants::Resolution::default().dimensions();
        Self {
            filter_type: FilterType::None,
            enhance: false,
            target_width,
            target_height,
        }
    }
}

/// Processed image data
pub struct ProcessedImage {
    pub image: RgbaImage,
    pub width: u32,
    pub height: u32,
}

/// Output dimensions for a capture
///
/// Live frames are limited per axis to the frame size and the requested
/// size; composited surfaces keep their size. Both are then capped.
pub fn capture_dimensions(
    source: CaptureSource,
    (frame_width, frame_height): (u32, u32),
    (target_width, target_height): (u32, u32),
) -> (u32, u32) {
    let (w, h) = match source {
        CaptureSource::LiveFrame => (
            frame_width.min(target_width),
            frame_height.min(target_height),
        ),
        CaptureSource::Composited => (frame_width, frame_height),
    };
    cap_dimensions(w, h)
}

/// Post-processor for captured frames
pub struct PostProcessor {
    config: PostProcessingConfig,
}

impl PostProcessor {
    /// Create a new post-processor with the given configuration
    pub fn new(config: PostProcessingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PostProcessingConfig {
        &self.config
    }

    /// Process a captured frame asynchronously
    ///
    /// Pixel work runs on the blocking pool so the render loop keeps going.
    pub async fn process(
        &self,
        frame: Arc<Frame>,
        source: CaptureSource,
    ) -> Result<ProcessedImage, PhotoError> {
        let config = self.config;
        let (width, height) = capture_dimensions(
            source,
            frame.dimensions(),
            (config.target_width, config.target_height),
        );
        info!(
            frame_width = frame.width,
            frame_height = frame.height,
            width,
            height,
            ?source,
            "Starting post-processing"
        );

        tokio::task::spawn_blocking(move || Self::process_sync(&frame, width, height, &config))
            .await?
    }

    fn process_sync(
        frame: &Frame,
        width: u32,
        height: u32,
        config: &PostProcessingConfig,
    ) -> Result<ProcessedImage, PhotoError> {
        if width == 0 || height == 0 {
            return Err(PhotoError::InvalidFrame("zero-sized capture".to_string()));
        }
        let source = frame.to_image().ok_or_else(|| {
            PhotoError::InvalidFrame(format!(
                "{}x{} frame has {} bytes",
                frame.width,
                frame.height,
                frame.data.len()
            ))
        })?;

        let mut image = if source.dimensions() == (width, height) {
            source
        } else {
            debug!(width, height, "Resizing capture");
            imageops::resize(&source, width, height, ResizeFilter::Triangle)
        };

        if config.enhance {
            auto_enhance(&mut image);
        }
        if config.filter_type != FilterType::None {
            apply_filter(&mut image, config.filter_type);
        }

        debug!("Post-processing complete");
        Ok(ProcessedImage {
            width,
            height,
            image,
        })
    }
}
