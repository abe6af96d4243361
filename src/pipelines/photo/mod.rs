// SPDX-License-Identifier: MPL-2.0

//! Async photo capture pipeline
//!
//! This pipeline implements a fully asynchronous photo capture workflow:
//!
//! ```text
//! Frame (live or composited) → Post-Processing → Encoding → CapturedArtifact
//!       ↓
//! Preview continues uninterrupted
//! ```
//!
//! # Pipeline Stages
//!
//! 1. **Post-Processing**: Resize to the capped capture size, enhance, filter
//! 2. **Encoding**: JPEG at fixed quality plus a thumbnail
//!
//! Both stages run on the blocking pool and hand the frame along by `Arc`.

pub mod encoding;
pub mod processing;

pub use encoding::{EncodedImage, PhotoEncoder};
pub use processing::{CaptureSource, PostProcessingConfig, PostProcessor, capture_dimensions};

use crate::backends::camera::Frame;
use crate::errors::PhotoError;
use crate::pipelines::artifact::{ArtifactKind, CapturedArtifact};
use std::sync::Arc;
use tracing::info;

/// Complete photo capture pipeline
///
/// Orchestrates the process → encode workflow.
pub struct PhotoPipeline {
    post_processor: PostProcessor,
    encoder: PhotoEncoder,
}

impl PhotoPipeline {
    /// Create a new photo pipeline with default settings
    pub fn new() -> Self {
        Self::with_config(PostProcessingConfig::default())
    }

    /// Create a new photo pipeline with custom processing settings
    pub fn with_config(processing_config: PostProcessingConfig) -> Self {
        Self {
            post_processor: PostProcessor::new(processing_config),
            encoder: PhotoEncoder::new(),
        }
    }

    /// Capture a photo from `frame`
    ///
    /// Produces a JPEG artifact at the capped capture size. A failed
    /// thumbnail does not fail the capture.
    pub async fn capture(
        &self,
        frame: Arc<Frame>,
        source: CaptureSource,
    ) -> Result<CapturedArtifact, PhotoError> {
        if !frame.is_valid() {
            return Err(PhotoError::NoFrameAvailable);
        }

        // Stage 1: Post-process (async, CPU-bound)
        let processed = self.post_processor.process(frame, source).await?;

        // Stage 2: Encode (async, CPU-bound)
        let encoded = self.encoder.encode(processed).await?;

        info!(
            width = encoded.width,
            height = encoded.height,
            size = encoded.data.len(),
            "Photo captured"
        );
        Ok(CapturedArtifact::new(
            ArtifactKind::Photo,
            encoded.data,
            (encoded.width, encoded.height),
            encoded.thumbnail,
        ))
    }
}

impl Default for PhotoPipeline {
    fn default() -> Self {
        Self::new()
    }
}
