// SPDX-License-Identifier: MPL-2.0

//! Core types for frame processing results
//!
//! These types are what the inference adapters publish and what the
//! compositor and overlay consume. They are only ever constructed from
//! validated model output.

use crate::backends::inference::{MaskValues, RawBox, RawMask};
use crate::constants::MASK_CONFIDENCE_THRESHOLD;
use crate::errors::InferenceError;
use std::sync::Arc;

/// A rectangular region within a frame
///
/// Coordinates are normalized (0.0 to 1.0) relative to the frame dimensions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameRegion {
    /// Left edge (0.0 = left of frame, 1.0 = right of frame)
    pub x: f32,
    /// Top edge (0.0 = top of frame, 1.0 = bottom of frame)
    pub y: f32,
    /// Width as fraction of frame width
    pub width: f32,
    /// Height as fraction of frame height
    pub height: f32,
}

impl FrameRegion {
    /// Same region in percent (0 to 100), as used by CSS-like overlays
    pub fn to_percent(&self) -> [f32; 4] {
        [
            self.x * 100.0,
            self.y * 100.0,
            self.width * 100.0,
            self.height * 100.0,
        ]
    }
}

/// Detected face in source-video pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl FaceBox {
    /// Validate a model box and clip it to the frame
    ///
    /// Returns `None` for non-finite values, non-positive sizes and boxes
    /// entirely outside the frame.
    pub fn from_raw(raw: &RawBox, frame_width: u32, frame_height: u32) -> Option<Self> {
        let values = [raw.x_min, raw.y_min, raw.width, raw.height];
        if values.iter().any(|v| !v.is_finite()) || raw.width <= 0.0 || raw.height <= 0.0 {
            return None;
        }

        let (fw, fh) = (frame_width as f32, frame_height as f32);
        let x0 = raw.x_min.clamp(0.0, fw);
        let y0 = raw.y_min.clamp(0.0, fh);
        let x1 = (raw.x_min + raw.width).clamp(0.0, fw);
        let y1 = (raw.y_min + raw.height).clamp(0.0, fh);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }

        Some(Self {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        })
    }

    /// Convert to a normalized region of a `frame_width` x `frame_height` frame
    pub fn to_region(&self, frame_width: u32, frame_height: u32) -> FrameRegion {
        let fw = frame_width.max(1) as f32;
        let fh = frame_height.max(1) as f32;
        FrameRegion {
            x: self.x / fw,
            y: self.y / fh,
            width: self.width / fw,
            height: self.height / fh,
        }
    }
}

/// Face boxes from one detection pass, with the frame size they refer to
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FaceDetections {
    pub boxes: Vec<FaceBox>,
    pub frame_width: u32,
    pub frame_height: u32,
    /// Sequence number of the analyzed frame
    pub frame_sequence: u64,
}

impl FaceDetections {
    /// Regions in display-percentage space for overlay rendering
    pub fn display_regions(&self) -> Vec<[f32; 4]> {
        self.boxes
            .iter()
            .map(|b| b.to_region(self.frame_width, self.frame_height).to_percent())
            .collect()
    }
}

/// Binary foreground mask (0 or 255 per pixel) at source resolution
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentationMask {
    pub width: u32,
    pub height: u32,
    pub data: Arc<[u8]>,
}

impl SegmentationMask {
    /// Validate and binarize model output
    ///
    /// Confidence values above [`MASK_CONFIDENCE_THRESHOLD`] become 255,
    /// everything else 0. Non-finite confidences count as background.
    pub fn from_raw(raw: RawMask) -> Result<Self, InferenceError> {
        let expected = raw.width as usize * raw.height as usize;
        if expected == 0 {
            return Err(InferenceError::MalformedResult("empty mask".to_string()));
        }
        if raw.values.len() != expected {
            return Err(InferenceError::MalformedResult(format!(
                "mask has {} values, expected {}x{} = {}",
                raw.values.len(),
                raw.width,
                raw.height,
                expected
            )));
        }

        let data: Vec<u8> = match raw.values {
            MaskValues::Confidence(values) => values
                .into_iter()
                .map(|v| if v > MASK_CONFIDENCE_THRESHOLD { 255 } else { 0 })
                .collect(),
            MaskValues::Binary(values) => values
                .into_iter()
                .map(|v| if v > 0 { 255 } else { 0 })
                .collect(),
        };

        Ok(Self {
            width: raw.width,
            height: raw.height,
            data: Arc::from(data),
        })
    }

    /// Whether this mask can be applied to a frame of the given size
    pub fn matches(&self, width: u32, height: u32) -> bool {
        self.width == width
            && self.height == height
            && self.data.len() == width as usize * height as usize
    }

    /// Fraction of foreground pixels
    pub fn coverage(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        let fg = self.data.iter().filter(|&&v| v > 0).count();
        fg as f32 / self.data.len() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_box(x: f32, y: f32, w: f32, h: f32) -> RawBox {
        RawBox {
            x_min: x,
            y_min: y,
            width: w,
            height: h,
            score: None,
        }
    }

    #[test]
    fn test_face_box_clipped_to_frame() {
        let b = FaceBox::from_raw(&raw_box(-10.0, 20.0, 50.0, 40.0), 100, 50).unwrap();
        assert_eq!((b.x, b.y, b.width, b.height), (0.0, 20.0, 40.0, 30.0));
    }

    #[test]
    fn test_face_box_rejects_garbage() {
        assert!(FaceBox::from_raw(&raw_box(f32::NAN, 0.0, 10.0, 10.0), 100, 100).is_none());
        assert!(FaceBox::from_raw(&raw_box(0.0, 0.0, -5.0, 10.0), 100, 100).is_none());
        assert!(FaceBox::from_raw(&raw_box(200.0, 0.0, 10.0, 10.0), 100, 100).is_none());
    }

    #[test]
    fn test_display_regions_in_percent() {
        let detections = FaceDetections {
            boxes: vec![FaceBox {
                x: 320.0,
                y: 180.0,
                width: 64.0,
                height: 72.0,
            }],
            frame_width: 640,
            frame_height: 360,
            frame_sequence: 1,
        };
        assert_eq!(detections.display_regions(), vec![[50.0, 50.0, 10.0, 20.0]]);
    }

    #[test]
    fn test_mask_threshold() {
        let mask = SegmentationMask::from_raw(RawMask {
            width: 2,
            height: 2,
            values: MaskValues::Confidence(vec![0.2, 0.5, 0.51, 1.0]),
        })
        .unwrap();
        assert_eq!(&*mask.data, &[0, 0, 255, 255]);
        assert_eq!(mask.coverage(), 0.5);
    }

    #[test]
    fn test_mask_length_mismatch_rejected() {
        let err = SegmentationMask::from_raw(RawMask {
            width: 4,
            height: 4,
            values: MaskValues::Binary(vec![1; 10]),
        })
        .unwrap_err();
        assert!(matches!(err, InferenceError::MalformedResult(_)));
    }

    #[test]
    fn test_mask_matches_exact_dimensions_only() {
        let mask = SegmentationMask::from_raw(RawMask {
            width: 640,
            height: 360,
            values: MaskValues::Binary(vec![0; 640 * 360]),
        })
        .unwrap();
        assert!(mask.matches(640, 360));
        assert!(!mask.matches(1280, 720));
    }
}
