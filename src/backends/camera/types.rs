// SPDX-License-Identifier: MPL-2.0

//! Shared types for camera backends

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::constants::{MAX_CAPTURE_HEIGHT, MAX_CAPTURE_WIDTH};

/// Frame data (RGBA, tightly packed)
pub type FrameData = Arc<[u8]>;

/// One sampled RGBA image from a live video source
///
/// Frames are immutable once published; consumers share them via `Arc`.
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    /// RGBA pixels, `width * height * 4` bytes, no row padding
    pub data: FrameData,
    /// Monotonic sequence number assigned by the producing stream
    pub sequence: u64,
    /// Timestamp when frame was captured
    pub captured_at: Instant,
}

impl Frame {
    /// Wrap raw RGBA data
    ///
    /// Returns `None` when the buffer length does not match the dimensions.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        if data.len() != expected_len(width, height) {
            return None;
        }
        Some(Self {
            width,
            height,
            data: Arc::from(data),
            sequence: 0,
            captured_at: Instant::now(),
        })
    }

    /// Build a frame from an `image` buffer
    pub fn from_image(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            data: Arc::from(image.into_raw()),
            sequence: 0,
            captured_at: Instant::now(),
        }
    }

    /// A single-color frame
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        Self::from_image(RgbaImage::from_pixel(width, height, image::Rgba(rgba)))
    }

    /// Copy pixels into an owned `image` buffer
    pub fn to_image(&self) -> Option<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, self.data.to_vec())
    }

    /// Dimensions as a tuple
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Whether the frame has pixels and a consistent buffer
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0 && self.data.len() == expected_len(self.width, self.height)
    }

    /// RGBA value at (x, y)
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        let px = self.data.get(idx..idx + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

/// Byte length of a packed RGBA buffer
pub fn expected_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * 4
}

/// Which camera to open
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Front (selfie) camera
    User,
    /// Rear camera
    #[default]
    Environment,
}

impl FacingMode {
    /// The other camera
    pub fn flipped(self) -> Self {
        match self {
            FacingMode::User => FacingMode::Environment,
            FacingMode::Environment => FacingMode::User,
        }
    }

    /// Front camera previews are shown mirrored
    pub fn is_mirrored(self) -> bool {
        self == FacingMode::User
    }
}

/// Parameters for acquiring a live stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamRequest {
    pub facing_mode: FacingMode,
    pub ideal_width: u32,
    pub ideal_height: u32,
    pub audio: bool,
}

impl StreamRequest {
    /// Build a request, clamping the ideal size to the stream cap
    pub fn new(facing_mode: FacingMode, ideal_width: u32, ideal_height: u32, audio: bool) -> Self {
        Self {
            facing_mode,
            ideal_width: ideal_width.min(MAX_CAPTURE_WIDTH),
            ideal_height: ideal_height.min(MAX_CAPTURE_HEIGHT),
            audio,
        }
    }
}

impl Default for StreamRequest {
    fn default() -> Self {
        Self::new(
            FacingMode::default(),
            MAX_CAPTURE_WIDTH,
            MAX_CAPTURE_HEIGHT,
            false,
        )
    }
}
