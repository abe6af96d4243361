// SPDX-License-Identifier: GPL-3.0-only

//! JPEG encode/decode helpers shared by photos, thumbnails and recordings

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ExtendedColorType, ImageError, RgbaImage};

/// Encode an RGBA image as baseline JPEG, dropping alpha
pub fn encode_rgba(image: &RgbaImage, quality: u8) -> Result<Vec<u8>, ImageError> {
    let rgb = DynamicImage::ImageRgba8(image.clone()).into_rgb8();
    encode_rgb_raw(rgb.as_raw(), rgb.width(), rgb.height(), quality)
}

/// Encode packed RGB bytes as JPEG
pub fn encode_rgb_raw(
    rgb: &[u8],
    width: u32,
    height: u32,
    quality: u8,
) -> Result<Vec<u8>, ImageError> {
    let mut buffer = Vec::new();
    {
        let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
        encoder.encode(rgb, width, height, ExtendedColorType::Rgb8)?;
    }
    Ok(buffer)
}

/// Decode JPEG bytes to RGBA
pub fn decode_rgba(bytes: &[u8]) -> Result<RgbaImage, ImageError> {
    let img = image::load_from_memory_with_format(bytes, image::ImageFormat::Jpeg)?;
    Ok(img.to_rgba8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_encode_produces_jpeg_with_same_size() {
        let image = RgbaImage::from_pixel(40, 30, Rgba([200, 100, 50, 128]));
        let bytes = encode_rgba(&image, 92).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8], "missing SOI marker");

        let decoded = decode_rgba(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (40, 30));
        // Alpha is dropped on encode
        assert_eq!(decoded.get_pixel(0, 0)[3], 255);
    }

    #[test]
    fn test_lower_quality_is_smaller() {
        let image = RgbaImage::from_fn(64, 64, |x, y| {
            Rgba([(x * 4) as u8, (y * 4) as u8, ((x ^ y) * 4) as u8, 255])
        });
        let high = encode_rgba(&image, 95).unwrap();
        let low = encode_rgba(&image, 20).unwrap();
        assert!(low.len() < high.len());
    }
}
