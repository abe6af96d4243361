// SPDX-License-Identifier: GPL-3.0-only

//! Portrait compositing
//!
//! Two passes over one frame: the whole frame is blurred to form the
//! background, then the sharp frame is drawn on top with the segmentation
//! mask as its alpha. With a binary mask this selects, per pixel, either the
//! sharp or the blurred value.

use crate::app::frame_processor::SegmentationMask;
use crate::backends::camera::Frame;
use crate::errors::PhotoError;
use image::RgbaImage;
use image::imageops;

/// Composite `frame` over its own blurred copy using `mask`
///
/// Fails if the mask does not match the frame exactly; callers fall back to
/// pass-through in that case.
pub fn composite_portrait(
    frame: &Frame,
    mask: &SegmentationMask,
    blur_sigma: f32,
) -> Result<Frame, PhotoError> {
    if !mask.matches(frame.width, frame.height) {
        return Err(PhotoError::InvalidFrame(format!(
            "mask {}x{} does not match frame {}x{}",
            mask.width, mask.height, frame.width, frame.height
        )));
    }
    let sharp = frame.to_image().ok_or_else(|| {
        PhotoError::InvalidFrame(format!(
            "{}x{} frame has {} bytes",
            frame.width,
            frame.height,
            frame.data.len()
        ))
    })?;

    let mut output = blur(&sharp, blur_sigma);
    matte(&mut output, &sharp, &mask.data);

    let mut composited = Frame::from_image(output);
    composited.sequence = frame.sequence;
    composited.captured_at = frame.captured_at;
    Ok(composited)
}

/// Gaussian-like blur with standard deviation `sigma` pixels
pub fn blur(image: &RgbaImage, sigma: f32) -> RgbaImage {
    if sigma <= 0.0 {
        return image.clone();
    }
    imageops::fast_blur(image, sigma)
}

/// Blend `foreground` over `background` with per-pixel alpha from `mask`
fn matte(background: &mut RgbaImage, foreground: &RgbaImage, mask: &[u8]) {
    let bg = background.as_mut();
    let fg = foreground.as_raw();

    for ((dst, src), &alpha) in bg.chunks_exact_mut(4).zip(fg.chunks_exact(4)).zip(mask) {
        match alpha {
            0 => {}
            255 => dst.copy_from_slice(src),
            a => {
                let a = a as u32;
                for c in 0..3 {
                    let v = (src[c] as u32 * a + dst[c] as u32 * (255 - a) + 127) / 255;
                    dst[c] = v as u8;
                }
            }
        }
    }
}
