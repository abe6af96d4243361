// SPDX-License-Identifier: MPL-2.0

//! WebM muxing into an in-memory sink
//!
//! The muxer runs in streamable mode: clusters are emitted as they complete
//! and nothing is rewritten at the end, so the output can be collected
//! chunk by chunk from an appsink.

use crate::errors::RecordingError;
use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app as gst_app;
use std::time::Duration;
use tracing::debug;

pub const FILE_EXTENSION: &str = "webm";
pub const MIME_TYPE: &str = "video/webm";

/// EBML header magic every WebM file starts with
pub const EBML_MAGIC: [u8; 4] = [0x1A, 0x45, 0xDF, 0xA3];

/// Muxer configuration
pub struct MuxerConfig {
    /// Muxer element
    pub muxer: gst::Element,
    /// Sink collecting the muxed bytes
    pub appsink: gst_app::AppSink,
}

/// Create a streamable WebM muxer and the appsink behind it
pub fn create_muxer() -> Result<MuxerConfig, RecordingError> {
    let muxer = gst::ElementFactory::make("webmmux")
        .name("recording_muxer")
        .build()
        .map_err(|e| RecordingError::StartFailed(format!("Failed to create webmmux: {}", e)))?;
    if muxer.has_property("streamable") {
        muxer.set_property("streamable", true);
    }

    let appsink = gst::ElementFactory::make("appsink")
        .name("recording_sink")
        .build()
        .map_err(|e| RecordingError::StartFailed(format!("Failed to create appsink: {}", e)))?
        .dynamic_cast::<gst_app::AppSink>()
        .map_err(|_| RecordingError::StartFailed("Failed to cast to AppSink".to_string()))?;
    appsink.set_property("emit-signals", false);
    appsink.set_property("sync", false);
    appsink.set_property("max-buffers", 0u32);
    appsink.set_property("drop", false);

    debug!("WebM muxer and appsink created");
    Ok(MuxerConfig { muxer, appsink })
}

/// Link video encoder to muxer
pub fn link_video_to_muxer(encoder: &gst::Element, muxer: &gst::Element) -> Result<(), RecordingError> {
    encoder
        .link(muxer)
        .map_err(|_| RecordingError::StartFailed("Failed to link video encoder to muxer".to_string()))?;

    debug!("Video encoder linked to muxer");
    Ok(())
}

/// Link muxer to appsink
pub fn link_muxer_to_sink(
    muxer: &gst::Element,
    appsink: &gst_app::AppSink,
) -> Result<(), RecordingError> {
    muxer
        .link(appsink)
        .map_err(|_| RecordingError::StartFailed("Failed to link muxer to appsink".to_string()))?;

    debug!("Muxer linked to appsink");
    Ok(())
}

fn append_sample(sample: &gst::Sample, out: &mut Vec<u8>) -> Result<usize, RecordingError> {
    let Some(buffer) = sample.buffer() else {
        return Ok(0);
    };
    let map = buffer
        .map_readable()
        .map_err(|e| RecordingError::EncodingFailed(format!("Failed to map buffer: {}", e)))?;
    out.extend_from_slice(map.as_slice());
    Ok(map.size())
}

/// Append whatever the muxer has produced so far, without waiting
pub fn drain_ready(appsink: &gst_app::AppSink, out: &mut Vec<u8>) -> Result<usize, RecordingError> {
    let mut bytes = 0;
    while let Some(sample) = appsink.try_pull_sample(gst::ClockTime::ZERO) {
        bytes += append_sample(&sample, out)?;
    }
    Ok(bytes)
}

/// Append everything up to end-of-stream
///
/// Blocks; fails if end-of-stream does not arrive within `timeout` of the
/// last buffer.
pub fn drain_to_eos(
    appsink: &gst_app::AppSink,
    out: &mut Vec<u8>,
    timeout: Duration,
) -> Result<usize, RecordingError> {
    let timeout = gst::ClockTime::from_nseconds(timeout.as_nanos() as u64);
    let mut bytes = 0;
    while let Some(sample) = appsink.try_pull_sample(timeout) {
        bytes += append_sample(&sample, out)?;
    }
    if !appsink.is_eos() {
        return Err(RecordingError::StopFailed(
            "timed out waiting for the encoder to finish".to_string(),
        ));
    }
    Ok(bytes)
}

/// Whether `data` starts with a WebM/Matroska header
pub fn is_webm(data: &[u8]) -> bool {
    data.starts_with(&EBML_MAGIC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_webm() {
        assert!(is_webm(&[0x1A, 0x45, 0xDF, 0xA3, 0x01]));
        assert!(!is_webm(b"RIFF"));
        assert!(!is_webm(&[]));
    }
}
