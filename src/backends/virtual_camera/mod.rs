// SPDX-License-Identifier: MPL-2.0

//! Virtual camera sources
//!
//! Backends that synthesize a live stream without camera hardware:
//!
//! - [`StillImageBackend`]: replays an image file
//! - [`TestPatternBackend`]: animated gradient at the requested size
//! - [`UnavailableBackend`]: always fails, for exercising the error path

pub mod file_source;

pub use file_source::{StillImageBackend, load_image_as_frame};

use crate::backends::camera::{
    CameraBackend, Frame, FrameSender, LiveStream, StreamRequest, stream_channel,
};
use crate::errors::CameraError;
use futures::future::BoxFuture;
use image::{Rgba, RgbaImage};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Spawn a task publishing `make_frame(tick)` every `interval`
///
/// The task ends on its own once every stream handle has been dropped.
pub(crate) fn spawn_producer<F>(
    sender: FrameSender,
    interval: Duration,
    mut make_frame: F,
) -> JoinHandle<()>
where
    F: FnMut(u64) -> Frame + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut tick = 0u64;
        loop {
            ticker.tick().await;
            if !sender.send(make_frame(tick)) {
                debug!("All stream handles dropped, producer exiting");
                break;
            }
            tick += 1;
        }
    })
}

/// Backend producing a moving color gradient
pub struct TestPatternBackend {
    frame_interval: Duration,
}

impl TestPatternBackend {
    /// 30 fps test pattern
    pub fn new() -> Self {
        Self {
            frame_interval: Duration::from_millis(33),
        }
    }

    /// Override the frame interval
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }
}

impl Default for TestPatternBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraBackend for TestPatternBackend {
    fn name(&self) -> &str {
        "test-pattern"
    }

    fn open(&self, request: StreamRequest) -> BoxFuture<'_, Result<LiveStream, CameraError>> {
        Box::pin(async move {
            info!(
                width = request.ideal_width,
                height = request.ideal_height,
                "Opening test pattern stream"
            );
            let (width, height) = (request.ideal_width.max(1), request.ideal_height.max(1));
            let (sender, stream) = stream_channel(request);
            let handle = spawn_producer(sender, self.frame_interval, move |tick| {
                test_pattern(width, height, tick)
            });
            stream.attach_producer(handle);
            Ok(stream)
        })
    }
}

/// Diagonal gradient shifted by `tick`
pub fn test_pattern(width: u32, height: u32, tick: u64) -> Frame {
    let shift = (tick % 256) as u32;
    let image = RgbaImage::from_fn(width, height, |x, y| {
        let r = ((x * 255) / width.max(1) + shift) % 256;
        let g = ((y * 255) / height.max(1) + shift) % 256;
        let b = ((x + y + shift) / 2) % 256;
        Rgba([r as u8, g as u8, b as u8, 255])
    });
    Frame::from_image(image)
}

/// Backend that always fails to open
pub struct UnavailableBackend {
    error: CameraError,
}

impl UnavailableBackend {
    pub fn new(error: CameraError) -> Self {
        Self { error }
    }
}

impl CameraBackend for UnavailableBackend {
    fn name(&self) -> &str {
        "unavailable"
    }

    fn open(&self, _request: StreamRequest) -> BoxFuture<'_, Result<LiveStream, CameraError>> {
        let error = self.error.clone();
        Box::pin(async move { Err(error) })
    }
}
