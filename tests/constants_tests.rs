// SPDX-License-Identifier: MPL-2.0

//! Integration tests for constants module

use aicam::constants::{MAX_CAPTURE_HEIGHT, MAX_CAPTURE_WIDTH, Resolution, cap_dimensions};

#[test]
fn test_resolution_values() {
    assert_eq!(Resolution::ALL.len(), 4);
    assert_eq!(Resolution::Mp108.dimensions(), (12032, 9024));
}

#[test]
fn test_resolution_ordering() {
    // Presets are ordered from smallest to largest
    let mut prev_pixels = 0u64;
    for preset in Resolution::ALL {
        let (w, h) = preset.dimensions();
        let pixels = w as u64 * h as u64;
        assert!(pixels > prev_pixels, "{:?} out of order", preset);
        prev_pixels = pixels;
    }
}

#[test]
fn test_capped_dimensions_never_exceed_max() {
    for preset in Resolution::ALL {
        let (w, h) = preset.capped_dimensions();
        assert!(w <= MAX_CAPTURE_WIDTH && h <= MAX_CAPTURE_HEIGHT);
    }
    assert_eq!(Resolution::Mp108.capped_dimensions(), (1920, 1080));
    assert_eq!(Resolution::Hd.capped_dimensions(), (1280, 720));
    assert_eq!(cap_dimensions(640, 4000), (640, 1080));
}

#[test]
fn test_resolution_ids_round_trip_through_serde() {
    for preset in Resolution::ALL {
        let json = serde_json::to_string(&preset).unwrap();
        let id = json.trim_matches('"');
        assert_eq!(Resolution::from_id(id), Some(preset));
    }
}

#[test]
fn test_resolution_display_names() {
    for preset in Resolution::ALL {
        assert!(
            !preset.display_name().is_empty(),
            "Preset {:?} has empty display name",
            preset
        );
    }
}
