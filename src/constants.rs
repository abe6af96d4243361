// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Capture resolution presets
///
/// The stream request and every still capture are capped to
/// [`MAX_CAPTURE_WIDTH`]x[`MAX_CAPTURE_HEIGHT`], so selecting
/// [`Resolution::Mp108`] only changes the requested ideal size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    /// 1280x720
    Hd,
    /// 1920x1080
    #[default]
    FullHd,
    /// 3840x2160
    #[serde(rename = "4k")]
    FourK,
    /// 12032x9024 ("108MP")
    #[serde(rename = "108mp")]
    Mp108,
}

impl Resolution {
    /// Get all resolution variants for UI iteration
    pub const ALL: [Resolution; 4] = [
        Resolution::Hd,
        Resolution::FullHd,
        Resolution::FourK,
        Resolution::Mp108,
    ];

    /// Get display name for the resolution
    pub fn display_name(&self) -> &'static str {
        match self {
            Resolution::Hd => "HD",
            Resolution::FullHd => "Full HD",
            Resolution::FourK => "4K",
            Resolution::Mp108 => "108MP",
        }
    }

    /// Nominal pixel dimensions (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Resolution::Hd => (1280, 720),
            Resolution::FullHd => (1920, 1080),
            Resolution::FourK => (3840, 2160),
            Resolution::Mp108 => (12032, 9024),
        }
    }

    /// Dimensions after applying the capture cap
    pub fn capped_dimensions(&self) -> (u32, u32) {
        let (w, h) = self.dimensions();
        cap_dimensions(w, h)
    }

    /// Parse the persisted identifier ("hd", "fullhd", "4k", "108mp")
    pub fn from_id(id: &str) -> Option<Self> {
        match id.to_ascii_lowercase().as_str() {
            "hd" => Some(Resolution::Hd),
            "fullhd" => Some(Resolution::FullHd),
            "4k" => Some(Resolution::FourK),
            "108mp" => Some(Resolution::Mp108),
            _ => None,
        }
    }
}

/// Clamp each dimension independently to the capture cap
pub fn cap_dimensions(width: u32, height: u32) -> (u32, u32) {
    (width.min(MAX_CAPTURE_WIDTH), height.min(MAX_CAPTURE_HEIGHT))
}

/// Maximum still capture / stream width
pub const MAX_CAPTURE_WIDTH: u32 = 1920;
/// Maximum still capture / stream height
pub const MAX_CAPTURE_HEIGHT: u32 = 1080;

/// JPEG quality for captured photos (0.92)
pub const PHOTO_JPEG_QUALITY: u8 = 92;

/// Longest edge of gallery thumbnails in pixels
pub const THUMBNAIL_SIZE: u32 = 100;
/// JPEG quality for thumbnails (0.7)
pub const THUMBNAIL_JPEG_QUALITY: u8 = 70;

/// Offset into a recording used for its thumbnail
pub const VIDEO_THUMBNAIL_OFFSET: Duration = Duration::from_millis(500);

/// Target bitrate for recordings (2.5 Mbit/s)
pub const RECORDING_BITRATE_BPS: u64 = 2_500_000;
/// Interval at which encoded frames are flushed into a chunk
pub const RECORDING_TIMESLICE: Duration = Duration::from_millis(1000);
/// Nominal framerate advertised to the encoder; buffers carry their own timestamps
pub const RECORDING_FRAMERATE: i32 = 30;
/// Longest wait for the encoder to drain after end-of-stream
pub const RECORDING_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);
/// Longest wait for a decoded frame when extracting a video thumbnail
pub const VIDEO_FRAME_TIMEOUT: Duration = Duration::from_secs(3);

/// Render tick period (display refresh, ~60 Hz)
pub const RENDER_PERIOD: Duration = Duration::from_micros(16_667);
/// Period at which frames are pushed to the person segmenter
pub const SEGMENTATION_PERIOD: Duration = Duration::from_millis(100);
/// Minimum pause between face detection passes
pub const FACE_DETECTION_PERIOD: Duration = Duration::from_micros(16_667);

/// Background blur radius used in portrait mode (pixels)
pub const PORTRAIT_BLUR_RADIUS: f32 = 10.0;

/// Maximum faces reported per detection pass
pub const MAX_FACES: usize = 5;

/// Segmentation confidence above which a pixel is foreground
pub const MASK_CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Capacity of the capture event broadcast channel
pub const CAPTURE_EVENT_CAPACITY: usize = 32;
