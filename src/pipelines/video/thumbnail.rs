// SPDX-License-Identifier: MPL-2.0

//! Representative thumbnail of a finished recording
//!
//! The recording is decoded from a temporary file, seeked to a fixed offset
//! and the first frame at or after it is scaled down. Recordings shorter than
//! the offset use their last frame.

use super::encoder;
use super::muxer::FILE_EXTENSION;
use crate::constants::VIDEO_FRAME_TIMEOUT;
use crate::errors::RecordingError;
use crate::media::thumbnail::{Thumbnail, create_thumbnail};
use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app as gst_app;
use image::RgbaImage;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// Thumbnail from the frame at `offset` into an encoded recording
pub fn video_thumbnail(data: &[u8], offset: Duration) -> Result<Thumbnail, RecordingError> {
    let path = temp_recording_path();
    std::fs::write(&path, data)
        .map_err(|e| RecordingError::EncodingFailed(format!("Failed to write temp file: {}", e)))?;

    let result = frame_at(&path, offset).and_then(|image| {
        create_thumbnail(&image).map_err(|e| RecordingError::EncodingFailed(e.to_string()))
    });

    if let Err(e) = std::fs::remove_file(&path) {
        warn!(path = %path.display(), error = %e, "Failed to remove temp recording");
    }
    result
}

fn temp_recording_path() -> PathBuf {
    std::env::temp_dir().join(format!("aicam-{}.{}", Uuid::new_v4(), FILE_EXTENSION))
}

fn clock_time(duration: Duration) -> gst::ClockTime {
    gst::ClockTime::from_nseconds(duration.as_nanos() as u64)
}

/// Decode the frame at `offset` from a recording on disk
pub fn frame_at(path: &Path, offset: Duration) -> Result<RgbaImage, RecordingError> {
    encoder::init()?;
    let (pipeline, appsink) = create_frame_extraction_pipeline(path)?;

    let sample = seek_sample(&pipeline, &appsink, offset);
    let _ = pipeline.set_state(gst::State::Null);
    image_from_sample(&sample?)
}

/// Decoder pipeline ending in an RGBA appsink
fn create_frame_extraction_pipeline(
    path: &Path,
) -> Result<(gst::Pipeline, gst_app::AppSink), RecordingError> {
    let pipeline_str = format!(
        "filesrc location=\"{}\" ! decodebin ! \
         videoconvert ! video/x-raw,format=RGBA ! \
         appsink name=sink max-buffers=1 drop=true sync=false",
        path.to_string_lossy()
    );

    let pipeline = gst::parse::launch(&pipeline_str)
        .map_err(|e| RecordingError::EncodingFailed(format!("Failed to create pipeline: {}", e)))?
        .downcast::<gst::Pipeline>()
        .map_err(|_| RecordingError::EncodingFailed("Failed to downcast to Pipeline".to_string()))?;

    let appsink = pipeline
        .by_name("sink")
        .ok_or_else(|| RecordingError::EncodingFailed("Failed to find appsink".to_string()))?
        .downcast::<gst_app::AppSink>()
        .map_err(|_| RecordingError::EncodingFailed("Failed to downcast to AppSink".to_string()))?;

    Ok((pipeline, appsink))
}

fn seek_sample(
    pipeline: &gst::Pipeline,
    appsink: &gst_app::AppSink,
    offset: Duration,
) -> Result<gst::Sample, RecordingError> {
    pipeline
        .set_state(gst::State::Paused)
        .map_err(|e| RecordingError::EncodingFailed(format!("Failed to pause pipeline: {:?}", e)))?;
    let (result, _state, _pending) = pipeline.state(clock_time(VIDEO_FRAME_TIMEOUT));
    result.map_err(|_| RecordingError::EncodingFailed("Recording failed to preroll".to_string()))?;

    match pipeline.seek_simple(
        gst::SeekFlags::FLUSH | gst::SeekFlags::ACCURATE,
        clock_time(offset),
    ) {
        Ok(()) => {
            pipeline.set_state(gst::State::Playing).map_err(|e| {
                RecordingError::EncodingFailed(format!("Failed to start pipeline: {:?}", e))
            })?;
            if let Some(sample) = appsink.try_pull_sample(clock_time(VIDEO_FRAME_TIMEOUT)) {
                debug!(offset_ms = offset.as_millis() as u64, "Thumbnail frame at offset");
                return Ok(sample);
            }
            debug!("No frame at offset, recording is shorter");
        }
        Err(e) => debug!(error = %e, "Seek failed, using the last frame"),
    }

    last_sample(pipeline, appsink)
}

/// Play from the start and keep the final frame
fn last_sample(
    pipeline: &gst::Pipeline,
    appsink: &gst_app::AppSink,
) -> Result<gst::Sample, RecordingError> {
    if let Err(e) = pipeline.seek_simple(gst::SeekFlags::FLUSH, gst::ClockTime::ZERO) {
        warn!(error = %e, "Rewind failed");
    }
    pipeline
        .set_state(gst::State::Playing)
        .map_err(|e| RecordingError::EncodingFailed(format!("Failed to start pipeline: {:?}", e)))?;

    let mut last = None;
    while let Some(sample) = appsink.try_pull_sample(clock_time(VIDEO_FRAME_TIMEOUT)) {
        last = Some(sample);
    }
    last.ok_or_else(|| RecordingError::EncodingFailed("Recording has no decodable frames".to_string()))
}

fn image_from_sample(sample: &gst::Sample) -> Result<RgbaImage, RecordingError> {
    let malformed = |msg: &str| RecordingError::EncodingFailed(msg.to_string());

    let caps = sample.caps().ok_or_else(|| malformed("No caps on sample"))?;
    let structure = caps.structure(0).ok_or_else(|| malformed("No structure in caps"))?;
    let width = structure
        .get::<i32>("width")
        .map_err(|_| malformed("No width in caps"))? as u32;
    let height = structure
        .get::<i32>("height")
        .map_err(|_| malformed("No height in caps"))? as u32;

    let buffer = sample.buffer().ok_or_else(|| malformed("No buffer in sample"))?;
    let map = buffer
        .map_readable()
        .map_err(|_| malformed("Failed to map buffer"))?;

    // RGBA rows are 4-byte aligned already, so there is no stride padding
    let len = width as usize * height as usize * 4;
    let data = map
        .as_slice()
        .get(..len)
        .ok_or_else(|| malformed("Short RGBA buffer"))?
        .to_vec();
    RgbaImage::from_raw(width, height, data).ok_or_else(|| malformed("Short RGBA buffer"))
}
