// SPDX-License-Identifier: GPL-3.0-only

//! Gallery thumbnails
//!
//! Thumbnails fit the longest edge to [`THUMBNAIL_SIZE`] and keep the aspect
//! ratio, rounding the short edge to the nearest pixel.

use crate::constants::{THUMBNAIL_JPEG_QUALITY, THUMBNAIL_SIZE};
use crate::errors::PhotoError;
use crate::media::jpeg;
use image::RgbaImage;
use image::imageops::{self, FilterType};
use std::sync::Arc;
use tracing::debug;

/// Small JPEG preview of a captured artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub width: u32,
    pub height: u32,
    pub jpeg: Arc<[u8]>,
}

/// Dimensions of a thumbnail of a `width` x `height` image fitted in `size`
///
/// 1920x1080 at size 100 gives 100x56. Never returns a zero dimension.
pub fn thumbnail_dimensions(width: u32, height: u32, size: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (0, 0);
    }
    let scale = (size as f64 / width as f64).min(size as f64 / height as f64);
    let w = ((width as f64 * scale).round() as u32).max(1);
    let h = ((height as f64 * scale).round() as u32).max(1);
    (w, h)
}

/// Thumbnail of an RGBA image at the default size and quality
pub fn create_thumbnail(image: &RgbaImage) -> Result<Thumbnail, PhotoError> {
    create_thumbnail_with_size(image, THUMBNAIL_SIZE)
}

pub fn create_thumbnail_with_size(image: &RgbaImage, size: u32) -> Result<Thumbnail, PhotoError> {
    let (width, height) = thumbnail_dimensions(image.width(), image.height(), size);
    if width == 0 {
        return Err(PhotoError::ThumbnailFailed("empty source image".to_string()));
    }

    let small = imageops::resize(image, width, height, FilterType::Triangle);
    let bytes = jpeg::encode_rgba(&small, THUMBNAIL_JPEG_QUALITY)
        .map_err(|e| PhotoError::ThumbnailFailed(e.to_string()))?;

    debug!(width, height, size = bytes.len(), "Thumbnail created");
    Ok(Thumbnail {
        width,
        height,
        jpeg: Arc::from(bytes),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_dimensions_preserve_aspect() {
        assert_eq!(thumbnail_dimensions(1920, 1080, 100), (100, 56));
        assert_eq!(thumbnail_dimensions(1080, 1920, 100), (56, 100));
        assert_eq!(thumbnail_dimensions(500, 500, 100), (100, 100));
        assert_eq!(thumbnail_dimensions(10000, 10, 100), (100, 1));
        assert_eq!(thumbnail_dimensions(0, 10, 100), (0, 0));
    }

    #[test]
    fn test_create_thumbnail() {
        let image = RgbaImage::from_pixel(320, 180, Rgba([10, 20, 30, 255]));
        let thumb = create_thumbnail(&image).unwrap();
        assert_eq!((thumb.width, thumb.height), (100, 56));
        let decoded = jpeg::decode_rgba(&thumb.jpeg).unwrap();
        assert_eq!(decoded.dimensions(), (100, 56));
    }

    #[test]
    fn test_empty_image_fails() {
        let image = RgbaImage::new(0, 0);
        assert!(matches!(
            create_thumbnail(&image),
            Err(PhotoError::ThumbnailFailed(_))
        ));
    }
}
