// SPDX-License-Identifier: GPL-3.0-only

//! Still image source
//!
//! Loads an image file and replays it as a live stream, resized to the
//! requested ideal size when it is larger. Useful for the CLI and for
//! running the pipeline without a physical camera.

use super::spawn_producer;
use crate::backends::camera::{CameraBackend, Frame, LiveStream, StreamRequest, stream_channel};
use crate::errors::CameraError;
use futures::future::BoxFuture;
use image::imageops::FilterType as ResizeFilter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Load an image file as an RGBA frame
pub fn load_image_as_frame(path: &Path) -> Result<Frame, CameraError> {
    info!(path = %path.display(), "Loading image file");

    let img = image::open(path).map_err(|e| {
        CameraError::NotAvailable(format!("Failed to load image '{}': {}", path.display(), e))
    })?;

    let rgba = img.to_rgba8();
    info!(
        width = rgba.width(),
        height = rgba.height(),
        "Image loaded successfully"
    );

    Ok(Frame::from_image(rgba))
}

/// Backend replaying a single image file
pub struct StillImageBackend {
    path: PathBuf,
    frame_interval: Duration,
}

impl StillImageBackend {
    /// Replay `path` at 30 fps
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            frame_interval: Duration::from_millis(33),
        }
    }

    /// Override the frame interval
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }
}

impl CameraBackend for StillImageBackend {
    fn name(&self) -> &str {
        "still-image"
    }

    fn open(&self, request: StreamRequest) -> BoxFuture<'_, Result<LiveStream, CameraError>> {
        Box::pin(async move {
            let path = self.path.clone();
            let frame = tokio::task::spawn_blocking(move || {
                let frame = load_image_as_frame(&path)?;
                Ok::<_, CameraError>(fit_to_request(frame, &request))
            })
            .await
            .map_err(|e| CameraError::InitializationFailed(e.to_string()))??;

            let frame = Arc::new(frame);
            let (sender, stream) = stream_channel(request);
            let handle = spawn_producer(sender, self.frame_interval, move |_| {
                Frame::clone(&frame)
            });
            stream.attach_producer(handle);
            Ok(stream)
        })
    }
}

/// Downscale a frame so it fits the request's ideal size
fn fit_to_request(frame: Frame, request: &StreamRequest) -> Frame {
    if frame.width <= request.ideal_width && frame.height <= request.ideal_height {
        return frame;
    }
    let Some(image) = frame.to_image() else {
        return frame;
    };
    let scale = (request.ideal_width as f32 / frame.width as f32)
        .min(request.ideal_height as f32 / frame.height as f32);
    let width = ((frame.width as f32 * scale).round() as u32).max(1);
    let height = ((frame.height as f32 * scale).round() as u32).max(1);
    Frame::from_image(image::imageops::resize(
        &image,
        width,
        height,
        ResizeFilter::Triangle,
    ))
}
