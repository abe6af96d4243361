// SPDX-License-Identifier: MPL-2.0

//! VP8 encoder setup and GStreamer plugin checks

use crate::errors::RecordingError;
use gstreamer as gst;
use gstreamer::prelude::*;
use tracing::{debug, info, warn};

/// Elements a recording pipeline is built from
const RECORDING_ELEMENTS: &[&str] = &["appsrc", "videoconvert", "vp8enc", "webmmux", "appsink"];

/// Elements the thumbnail decoder is built from
const DECODING_ELEMENTS: &[&str] = &["filesrc", "decodebin", "vp8dec", "matroskademux"];

/// Keyframe interval in frames, so seeking never has to decode far
const KEYFRAME_MAX_DIST: u32 = 15;

/// Initialize GStreamer (idempotent)
pub fn init() -> Result<(), RecordingError> {
    gst::init()
        .map_err(|e| RecordingError::StartFailed(format!("Failed to initialize GStreamer: {}", e)))
}

fn missing_elements(names: &[&'static str]) -> Vec<&'static str> {
    names
        .iter()
        .copied()
        .filter(|name| gst::ElementFactory::find(name).is_none())
        .collect()
}

/// Fail unless every element needed to record and thumbnail a video exists
pub fn check_available_encoders() -> Result<(), RecordingError> {
    init()?;
    let mut missing = missing_elements(RECORDING_ELEMENTS);
    missing.extend(missing_elements(DECODING_ELEMENTS));
    if !missing.is_empty() {
        warn!(?missing, "GStreamer elements missing, recording unavailable");
        return Err(RecordingError::StartFailed(format!(
            "missing GStreamer elements: {}",
            missing.join(", ")
        )));
    }
    Ok(())
}

/// Whether GStreamer and the VP8/WebM plugins are installed
pub fn encoder_available() -> bool {
    check_available_encoders().is_ok()
}

/// Realtime constant-bitrate VP8 encoder
pub fn create_vp8_encoder(bitrate_bps: u64) -> Result<gst::Element, RecordingError> {
    let encoder = gst::ElementFactory::make("vp8enc")
        .name("recording_encoder")
        .build()
        .map_err(|e| RecordingError::StartFailed(format!("Failed to create vp8enc: {}", e)))?;

    let bitrate = bitrate_bps.min(i32::MAX as u64);
    if encoder.has_property("target-bitrate") {
        encoder.set_property_from_str("target-bitrate", &bitrate.to_string());
    }
    if encoder.has_property("end-usage") {
        encoder.set_property_from_str("end-usage", "cbr");
    }
    if encoder.has_property("deadline") {
        // 1 = realtime
        encoder.set_property_from_str("deadline", "1");
    }
    if encoder.has_property("keyframe-max-dist") {
        encoder.set_property_from_str("keyframe-max-dist", &KEYFRAME_MAX_DIST.to_string());
    }

    info!(bitrate, "VP8 encoder created");
    debug!(keyframe_max_dist = KEYFRAME_MAX_DIST, "VP8 encoder configured for CBR");
    Ok(encoder)
}
