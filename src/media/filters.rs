// SPDX-License-Identifier: MPL-2.0

//! CPU color filters and auto-enhance
//!
//! Filters are stateless per-pixel transforms over interleaved 8-bit
//! buffers. Alpha (or any channel past the third) is left untouched and every
//! output channel is clamped to `[0, 255]` and rounded to nearest.
//!
//! The default stride is 4 (RGBA). Use the `_with_stride` variants for packed
//! RGB data.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Bytes per pixel of the default (RGBA) layout
pub const RGBA_STRIDE: usize = 4;

/// Sepia matrix applied by the vintage filter, row-major (R', G', B')
const SEPIA: [[f32; 3]; 3] = [
    [0.393, 0.769, 0.189],
    [0.349, 0.686, 0.168],
    [0.272, 0.534, 0.131],
];
const VINTAGE_SCALE: f32 = 0.95;

const CINEMATIC_CONTRAST: f32 = 1.2;
/// -5% of mid-gray
const CINEMATIC_OFFSET: f32 = (0.95 - 1.0) * 128.0;

const BW_GAIN: f32 = 1.1;

const WARM_GAINS: [f32; 3] = [1.05, 1.02, 0.95];
const COOL_GAINS: [f32; 3] = [0.95, 1.02, 1.08];

/// Auto-enhance aims every channel mean at mid-gray
const ENHANCE_TARGET: f64 = 128.0;
const ENHANCE_MAX_GAIN: f64 = 1.5;
const ENHANCE_BOOST: f64 = 1.1;

/// Filter types for the capture pipeline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    /// No filter applied
    #[default]
    None,
    /// Sepia matrix, slightly darkened
    Vintage,
    /// Contrast boost around mid-gray
    Cinematic,
    /// Black & white (luminance)
    Bw,
    /// Orange/amber color temperature
    Warm,
    /// Blue color temperature
    Cool,
}

impl FilterType {
    /// Get all filter variants for UI iteration
    pub const ALL: [FilterType; 6] = [
        FilterType::None,
        FilterType::Vintage,
        FilterType::Cinematic,
        FilterType::Bw,
        FilterType::Warm,
        FilterType::Cool,
    ];

    /// Persisted identifier
    pub fn id(&self) -> &'static str {
        match self {
            FilterType::None => "none",
            FilterType::Vintage => "vintage",
            FilterType::Cinematic => "cinematic",
            FilterType::Bw => "bw",
            FilterType::Warm => "warm",
            FilterType::Cool => "cool",
        }
    }

    /// Get display name for the filter
    pub fn display_name(&self) -> &'static str {
        match self {
            FilterType::None => "None",
            FilterType::Vintage => "Vintage",
            FilterType::Cinematic => "Cinematic",
            FilterType::Bw => "B&W",
            FilterType::Warm => "Warm",
            FilterType::Cool => "Cool",
        }
    }

    /// Transform a single pixel
    pub fn transform(&self, r: u8, g: u8, b: u8) -> [u8; 3] {
        let (r, g, b) = (r as f32, g as f32, b as f32);
        let [r, g, b] = match self {
            FilterType::None => [r, g, b],
            FilterType::Vintage => {
                SEPIA.map(|row| (row[0] * r + row[1] * g + row[2] * b) * VINTAGE_SCALE)
            }
            FilterType::Cinematic => [r, g, b]
                .map(|c| (c - 128.0) * CINEMATIC_CONTRAST + 128.0 + CINEMATIC_OFFSET),
            FilterType::Bw => {
                let gray = (0.299 * r + 0.587 * g + 0.114 * b) * BW_GAIN;
                [gray, gray, gray]
            }
            FilterType::Warm => scale([r, g, b], WARM_GAINS),
            FilterType::Cool => scale([r, g, b], COOL_GAINS),
        };
        [to_channel(r), to_channel(g), to_channel(b)]
    }
}

impl fmt::Display for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for FilterType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FilterType::ALL
            .into_iter()
            .find(|f| f.id().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown filter '{}'", s))
    }
}

fn scale(rgb: [f32; 3], gains: [f32; 3]) -> [f32; 3] {
    [rgb[0] * gains[0], rgb[1] * gains[1], rgb[2] * gains[2]]
}

#[inline]
fn to_channel(v: f32) -> u8 {
    v.clamp(0.0, 255.0).round() as u8
}

/// Apply a filter in place to an RGBA buffer
pub fn apply_filter(pixels: &mut [u8], filter: FilterType) {
    apply_filter_with_stride(pixels, RGBA_STRIDE, filter);
}

/// Apply a filter in place to a buffer with `stride` bytes per pixel (>= 3)
///
/// A trailing partial pixel is left untouched.
pub fn apply_filter_with_stride(pixels: &mut [u8], stride: usize, filter: FilterType) {
    debug_assert!(stride >= 3);
    if filter == FilterType::None {
        return;
    }

    for px in pixels.chunks_exact_mut(stride) {
        let [r, g, b] = filter.transform(px[0], px[1], px[2]);
        px[0] = r;
        px[1] = g;
        px[2] = b;
    }
}

/// Global white-balance and brightness correction on an RGBA buffer
///
/// One pass collects the channel means, a second applies
/// `min(128 / mean_r, 128 / mean_g, 128 / mean_b, 1.5) * 1.1` to every
/// channel. A zero mean is treated as 1.
pub fn auto_enhance(pixels: &mut [u8]) {
    auto_enhance_with_stride(pixels, RGBA_STRIDE);
}

/// [`auto_enhance`] for a buffer with `stride` bytes per pixel (>= 3)
pub fn auto_enhance_with_stride(pixels: &mut [u8], stride: usize) {
    debug_assert!(stride >= 3);
    let gain = enhance_gain(pixels, stride) as f32;

    for px in pixels.chunks_exact_mut(stride) {
        for c in &mut px[..3] {
            *c = to_channel(*c as f32 * gain);
        }
    }
}

/// Gain that [`auto_enhance`] would apply, including the final boost
pub fn enhance_gain(pixels: &[u8], stride: usize) -> f64 {
    let mut sums = [0u64; 3];
    let mut count = 0u64;
    for px in pixels.chunks_exact(stride) {
        sums[0] += px[0] as u64;
        sums[1] += px[1] as u64;
        sums[2] += px[2] as u64;
        count += 1;
    }

    if count == 0 {
        return ENHANCE_BOOST;
    }

    let gain = sums
        .iter()
        .map(|&sum| {
            let mean = sum as f64 / count as f64;
            let mean = if mean == 0.0 { 1.0 } else { mean };
            ENHANCE_TARGET / mean
        })
        .fold(ENHANCE_MAX_GAIN, f64::min);

    gain * ENHANCE_BOOST
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(r: u8, g: u8, b: u8, a: u8, pixels: usize) -> Vec<u8> {
        [r, g, b, a].repeat(pixels)
    }

    #[test]
    fn test_vintage_on_mid_gray() {
        // (0.393 + 0.769 + 0.189) * 128 * 0.95 = 164.28
        // (0.349 + 0.686 + 0.168) * 128 * 0.95 = 146.28
        // (0.272 + 0.534 + 0.131) * 128 * 0.95 = 113.94
        let mut buf = solid(128, 128, 128, 255, 4);
        apply_filter(&mut buf, FilterType::Vintage);
        assert_eq!(&buf[..4], &[164, 146, 114, 255]);
    }

    #[test]
    fn test_vintage_clamps_white() {
        assert_eq!(FilterType::Vintage.transform(255, 255, 255), [255, 255, 227]);
    }

    #[test]
    fn test_cinematic() {
        // mid-gray only gets the -6.4 offset
        assert_eq!(FilterType::Cinematic.transform(128, 128, 128), [122, 122, 122]);
        assert_eq!(FilterType::Cinematic.transform(0, 255, 200), [0, 255, 208]);
    }

    #[test]
    fn test_bw_channels_equal() {
        let [r, g, b] = FilterType::Bw.transform(200, 100, 50);
        assert_eq!(r, g);
        assert_eq!(g, b);
        // (0.299*200 + 0.587*100 + 0.114*50) * 1.1 = 136.62
        assert_eq!(r, 137);
    }

    #[test]
    fn test_warm_and_cool() {
        assert_eq!(FilterType::Warm.transform(100, 100, 100), [105, 102, 95]);
        assert_eq!(FilterType::Cool.transform(100, 100, 100), [95, 102, 108]);
        assert_eq!(FilterType::Warm.transform(250, 0, 0), [255, 0, 0]);
    }

    #[test]
    fn test_alpha_untouched() {
        let mut buf = solid(10, 20, 30, 77, 3);
        for filter in FilterType::ALL {
            apply_filter(&mut buf, filter);
            assert!(buf.chunks(4).all(|px| px[3] == 77), "{:?}", filter);
        }
    }

    #[test]
    fn test_rgb_stride() {
        let mut buf = vec![128u8; 6];
        apply_filter_with_stride(&mut buf, 3, FilterType::Vintage);
        assert_eq!(buf, vec![164, 146, 114, 164, 146, 114]);
    }

    #[test]
    fn test_auto_enhance_mid_gray() {
        let mut buf = solid(128, 128, 128, 255, 16);
        auto_enhance(&mut buf);
        // gain 1.0 * 1.1
        assert_eq!(&buf[..4], &[141, 141, 141, 255]);
    }

    #[test]
    fn test_auto_enhance_dark_gain_clamped() {
        let mut buf = solid(20, 20, 20, 255, 16);
        auto_enhance(&mut buf);
        // 128/20 = 6.4 clamps to 1.5, times 1.1 = 1.65
        assert_eq!(&buf[..3], &[33, 33, 33]);
    }

    #[test]
    fn test_auto_enhance_black_buffer() {
        let mut buf = solid(0, 0, 0, 255, 8);
        auto_enhance(&mut buf);
        assert!(buf.chunks(4).all(|px| px == [0, 0, 0, 255]));
    }

    #[test]
    fn test_auto_enhance_uses_weakest_channel_gain() {
        // red mean 200 limits the gain to 0.64
        let gain = enhance_gain(&solid(200, 100, 100, 255, 4), 4);
        assert!((gain - 128.0 / 200.0 * 1.1).abs() < 1e-9);
    }

    #[test]
    fn test_empty_buffer() {
        let mut buf: Vec<u8> = Vec::new();
        auto_enhance(&mut buf);
        apply_filter(&mut buf, FilterType::Bw);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_parse_ids() {
        for filter in FilterType::ALL {
            assert_eq!(filter.id().parse::<FilterType>(), Ok(filter));
        }
        assert!("sepia".parse::<FilterType>().is_err());
    }
}
