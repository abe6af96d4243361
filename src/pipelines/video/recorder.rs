// SPDX-License-Identifier: MPL-2.0

//! Video recording pipeline with chunked WebM output
//!
//! This module implements video recording with:
//! - Preview continues during recording (frames are read from the stream's
//!   latest-value channel, never taken from the compositor)
//! - appsrc -> videoconvert -> vp8enc -> webmmux -> appsink
//! - Muxed output collected into one chunk per timeslice
//! - Bitrate targeting by the encoder's constant-bitrate mode
//! - Thumbnail derived from a fixed offset into the finished recording

use super::encoder::{self, create_vp8_encoder};
use super::muxer::{self, MuxerConfig, create_muxer, link_muxer_to_sink, link_video_to_muxer};
use super::thumbnail::video_thumbnail;
use crate::backends::camera::{Frame, LiveStream};
use crate::constants::{
    RECORDING_BITRATE_BPS, RECORDING_DRAIN_TIMEOUT, RECORDING_FRAMERATE, RECORDING_TIMESLICE,
    VIDEO_THUMBNAIL_OFFSET,
};
use crate::errors::RecordingError;
use crate::pipelines::artifact::{ArtifactKind, CapturedArtifact};
use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app as gst_app;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};

/// Recording parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordingConfig {
    /// Target bitrate in bits per second
    pub bitrate_bps: u64,
    /// How often muxed output is sealed into a chunk
    pub timeslice: Duration,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            bitrate_bps: RECORDING_BITRATE_BPS,
            timeslice: RECORDING_TIMESLICE,
        }
    }
}

impl RecordingConfig {
    /// Byte budget for one chunk
    pub fn chunk_budget(&self) -> usize {
        (self.bitrate_bps as f64 / 8.0 * self.timeslice.as_secs_f64()) as usize
    }
}

/// Encoding pipeline for one recording
struct EncodePipeline {
    pipeline: gst::Pipeline,
    appsrc: gst_app::AppSrc,
    appsink: gst_app::AppSink,
    width: u32,
    height: u32,
}

impl EncodePipeline {
    fn new(width: u32, height: u32, config: &RecordingConfig) -> Result<Self, RecordingError> {
        info!(width, height, bitrate = config.bitrate_bps, "Creating recording pipeline");
        encoder::init()?;

        let pipeline = gst::Pipeline::new();

        let appsrc = gst::ElementFactory::make("appsrc")
            .name("recording_src")
            .build()
            .map_err(|e| RecordingError::StartFailed(format!("Failed to create appsrc: {}", e)))?
            .downcast::<gst_app::AppSrc>()
            .map_err(|_| RecordingError::StartFailed("Failed to downcast to AppSrc".to_string()))?;

        // Buffers carry their own timestamps; the framerate is nominal
        let caps = gst::Caps::builder("video/x-raw")
            .field("format", "RGBA")
            .field("width", width as i32)
            .field("height", height as i32)
            .field("framerate", gst::Fraction::new(RECORDING_FRAMERATE, 1))
            .build();
        appsrc.set_caps(Some(&caps));
        appsrc.set_format(gst::Format::Time);

        let videoconvert = gst::ElementFactory::make("videoconvert")
            .build()
            .map_err(|e| RecordingError::StartFailed(format!("Failed to create videoconvert: {}", e)))?;
        let video_encoder = create_vp8_encoder(config.bitrate_bps)?;
        let MuxerConfig { muxer, appsink } = create_muxer()?;

        pipeline
            .add_many([
                appsrc.upcast_ref(),
                &videoconvert,
                &video_encoder,
                &muxer,
                appsink.upcast_ref(),
            ])
            .map_err(|e| RecordingError::StartFailed(format!("Failed to add elements: {}", e)))?;

        gst::Element::link_many([appsrc.upcast_ref(), &videoconvert, &video_encoder])
            .map_err(|e| RecordingError::StartFailed(format!("Failed to link elements: {}", e)))?;
        link_video_to_muxer(&video_encoder, &muxer)?;
        link_muxer_to_sink(&muxer, &appsink)?;

        pipeline
            .set_state(gst::State::Playing)
            .map_err(|e| RecordingError::StartFailed(format!("Failed to start pipeline: {}", e)))?;

        Ok(Self {
            pipeline,
            appsrc,
            appsink,
            width,
            height,
        })
    }

    fn push(&self, frame: &Frame, pts: Duration) -> Result<(), RecordingError> {
        let mut buffer = gst::Buffer::from_mut_slice(frame.data.to_vec());
        if let Some(buffer) = buffer.get_mut() {
            buffer.set_pts(gst::ClockTime::from_nseconds(pts.as_nanos() as u64));
        }
        self.appsrc
            .push_buffer(buffer)
            .map_err(|e| RecordingError::EncodingFailed(format!("Failed to push frame: {:?}", e)))?;
        Ok(())
    }

    /// First error posted on the bus, if any
    fn check_bus(&self) -> Result<(), RecordingError> {
        let Some(bus) = self.pipeline.bus() else {
            return Ok(());
        };
        if let Some(msg) = bus.pop_filtered(&[gst::MessageType::Error])
            && let gst::MessageView::Error(err) = msg.view()
        {
            error!(
                error = %err.error(),
                debug = ?err.debug(),
                source = ?err.src().map(|s| s.name()),
                "GStreamer error during recording"
            );
            return Err(RecordingError::EncodingFailed(err.error().to_string()));
        }
        Ok(())
    }

    /// Send end-of-stream and collect the remaining output (blocking)
    fn finish(&self, out: &mut Vec<u8>) -> Result<usize, RecordingError> {
        debug!("Sending EOS to recording pipeline");
        if let Err(e) = self.appsrc.end_of_stream() {
            warn!(?e, "Failed to send EOS to appsrc");
        }
        let drained = muxer::drain_to_eos(&self.appsink, out, RECORDING_DRAIN_TIMEOUT);
        self.check_bus()?;
        drained
    }
}

impl Drop for EncodePipeline {
    fn drop(&mut self) {
        // Ensure pipeline is properly stopped to avoid GStreamer warnings
        let _ = self.pipeline.set_state(gst::State::Null);
    }
}

/// Output of the recording task
#[derive(Debug)]
struct RecordingOutput {
    data: Vec<u8>,
    chunks: usize,
    dimensions: Option<(u32, u32)>,
    frame_count: usize,
}

/// Per-recording encoder state
struct ChunkEncoder {
    config: RecordingConfig,
    budget: usize,
    started: Instant,
    pipeline: Option<EncodePipeline>,
    chunks: Vec<Vec<u8>>,
    chunk_frames: usize,
    frame_count: usize,
}

impl ChunkEncoder {
    fn new(config: RecordingConfig) -> Self {
        Self {
            config,
            budget: config.chunk_budget().max(1),
            started: Instant::now(),
            pipeline: None,
            chunks: Vec::new(),
            chunk_frames: 0,
            frame_count: 0,
        }
    }

    /// Feed one frame; the pipeline is built on the first one
    fn push(&mut self, frame: Arc<Frame>) -> Result<(), RecordingError> {
        if !frame.is_valid() {
            warn!("Skipping invalid frame");
            return Ok(());
        }

        if self.pipeline.is_none() {
            self.pipeline = Some(EncodePipeline::new(frame.width, frame.height, &self.config)?);
        }
        let Some(pipeline) = &self.pipeline else {
            return Ok(());
        };
        if (pipeline.width, pipeline.height) != frame.dimensions() {
            warn!(
                expected = ?(pipeline.width, pipeline.height),
                got = ?frame.dimensions(),
                "Skipping frame with changed dimensions"
            );
            return Ok(());
        }

        let pts = self.started.elapsed();
        pipeline.push(&frame, pts)?;
        self.chunk_frames += 1;
        self.frame_count += 1;
        trace!(pts_ms = pts.as_millis() as u64, "Frame queued for encoding");
        Ok(())
    }

    /// Seal what the muxer produced this timeslice into a chunk
    fn flush(&mut self) -> Result<(), RecordingError> {
        let Some(pipeline) = &self.pipeline else {
            return Ok(());
        };
        pipeline.check_bus()?;

        let mut chunk = Vec::new();
        muxer::drain_ready(&pipeline.appsink, &mut chunk)?;
        let frames = std::mem::take(&mut self.chunk_frames);
        self.seal(chunk, frames);
        Ok(())
    }

    fn seal(&mut self, chunk: Vec<u8>, frames: usize) {
        if chunk.is_empty() {
            trace!(frames, "Empty timeslice dropped");
            return;
        }
        let size = chunk.len();
        if size > self.budget + self.budget / 10 {
            debug!(size, budget = self.budget, "Chunk over bitrate budget");
        }
        self.chunks.push(chunk);
        debug!(chunk = self.chunks.len(), size, frames, budget = self.budget, "Chunk sealed");
    }

    /// End the stream and concatenate all chunks (blocking)
    fn finish(mut self) -> Result<RecordingOutput, RecordingError> {
        let dimensions = self.pipeline.as_ref().map(|p| (p.width, p.height));
        if let Some(pipeline) = self.pipeline.take() {
            let mut tail = Vec::new();
            pipeline.finish(&mut tail)?;
            let frames = std::mem::take(&mut self.chunk_frames);
            self.seal(tail, frames);
        }

        let chunks = self.chunks.len();
        Ok(RecordingOutput {
            data: self.chunks.concat(),
            chunks,
            dimensions,
            frame_count: self.frame_count,
        })
    }
}

async fn record_loop(
    mut frames: watch::Receiver<Option<Arc<Frame>>>,
    mut stop_rx: oneshot::Receiver<()>,
    config: RecordingConfig,
) -> Result<RecordingOutput, RecordingError> {
    let mut encoder = ChunkEncoder::new(config);
    let mut ticker = tokio::time::interval_at(Instant::now() + config.timeslice, config.timeslice);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // Frame already on screen when recording starts
    let current = frames.borrow_and_update().clone();
    if let Some(frame) = current {
        encoder.push(frame)?;
    }

    loop {
        tokio::select! {
            _ = &mut stop_rx => {
                debug!("Stop requested");
                break;
            }
            changed = frames.changed() => {
                if changed.is_err() {
                    info!("Stream ended during recording");
                    break;
                }
                let frame = frames.borrow_and_update().clone();
                if let Some(frame) = frame {
                    encoder.push(frame)?;
                }
            }
            _ = ticker.tick() => encoder.flush()?,
        }
    }

    tokio::task::spawn_blocking(move || encoder.finish())
        .await
        .map_err(|e| RecordingError::StopFailed(e.to_string()))?
}

/// Video recorder reading frames from a live stream
#[derive(Debug)]
pub struct VideoRecorder {
    stop_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<RecordingOutput, RecordingError>>,
    started: Instant,
}

impl VideoRecorder {
    /// Start recording `stream`
    pub fn start(stream: &LiveStream, config: RecordingConfig) -> Result<Self, RecordingError> {
        if stream.is_stopped() {
            return Err(RecordingError::StartFailed("stream is stopped".to_string()));
        }
        encoder::check_available_encoders()?;

        info!(
            bitrate = config.bitrate_bps,
            timeslice_ms = config.timeslice.as_millis() as u64,
            audio = stream.request().audio,
            "Starting video recording"
        );
        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(record_loop(stream.subscribe(), stop_rx, config));

        Ok(Self {
            stop_tx: Some(stop_tx),
            task,
            started: Instant::now(),
        })
    }

    /// Time since recording started
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Stop recording and assemble the video artifact
    ///
    /// Fails with [`RecordingError::Empty`] if no frame was recorded. A
    /// thumbnail failure leaves the artifact without a thumbnail.
    pub async fn stop(mut self) -> Result<CapturedArtifact, RecordingError> {
        info!("Stopping video recording");
        if let Some(stop_tx) = self.stop_tx.take() {
            // The loop may already have ended with the stream
            let _ = stop_tx.send(());
        }

        let output = (&mut self.task)
            .await
            .map_err(|e| RecordingError::StopFailed(e.to_string()))??;

        let Some((width, height)) = output.dimensions else {
            return Err(RecordingError::Empty);
        };
        if output.frame_count == 0 {
            return Err(RecordingError::Empty);
        }
        if !muxer::is_webm(&output.data) {
            return Err(RecordingError::StopFailed(
                "encoder produced no WebM output".to_string(),
            ));
        }
        info!(
            width,
            height,
            frames = output.frame_count,
            chunks = output.chunks,
            size = output.data.len(),
            "Recording finalized"
        );

        let data = output.data;
        let (data, thumbnail) = tokio::task::spawn_blocking(move || {
            let thumbnail = match video_thumbnail(&data, VIDEO_THUMBNAIL_OFFSET) {
                Ok(thumbnail) => Some(thumbnail),
                Err(e) => {
                    warn!(error = %e, "Video thumbnail failed, keeping recording without it");
                    None
                }
            };
            (data, thumbnail)
        })
        .await
        .map_err(|e| RecordingError::StopFailed(e.to_string()))?;

        Ok(CapturedArtifact::new(
            ArtifactKind::Video,
            data,
            (width, height),
            thumbnail,
        ))
    }
}

impl Drop for VideoRecorder {
    fn drop(&mut self) {
        // Recording dropped without stop(): discard it
        if self.stop_tx.is_some() {
            self.task.abort();
        }
    }
}
