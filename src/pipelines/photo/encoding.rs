// SPDX-License-Identifier: GPL-3.0-only

//! Async photo encoding pipeline
//!
//! Encodes processed images to JPEG at a fixed quality and derives the
//! gallery thumbnail. Encoding runs on the blocking pool.

use super::processing::ProcessedImage;
use crate::constants::PHOTO_JPEG_QUALITY;
use crate::errors::PhotoError;
use crate::media::jpeg;
use crate::media::thumbnail::{Thumbnail, create_thumbnail};
use tracing::{debug, info, warn};

/// Encoded image data ready for the gallery
pub struct EncodedImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// `None` when thumbnail derivation failed
    pub thumbnail: Option<Thumbnail>,
}

/// Photo encoder
pub struct PhotoEncoder {
    quality: u8,
}

impl PhotoEncoder {
    /// Create a new encoder at the standard photo quality
    pub fn new() -> Self {
        Self {
            quality: PHOTO_JPEG_QUALITY,
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Encode a processed image asynchronously
    pub async fn encode(&self, processed: ProcessedImage) -> Result<EncodedImage, PhotoError> {
        info!(
            width = processed.width,
            height = processed.height,
            quality = self.quality,
            "Starting encoding"
        );

        let quality = self.quality;
        tokio::task::spawn_blocking(move || {
            let data = jpeg::encode_rgba(&processed.image, quality)?;
            debug!(size = data.len(), "Encoding complete");

            let thumbnail = match create_thumbnail(&processed.image) {
                Ok(thumbnail) => Some(thumbnail),
                Err(e) => {
                    warn!(error = %e, "Photo thumbnail failed");
                    None
                }
            };

            Ok::<_, PhotoError>(EncodedImage {
                data,
                width: processed.width,
                height: processed.height,
                thumbnail,
            })
        })
        .await?
    }
}

impl Default for PhotoEncoder {
    fn default() -> Self {
        Self::new()
    }
}
