// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for camera operations
//!
//! This module provides command-line functionality for:
//! - Taking photos from an image source
//! - Recording videos
//! - Running the compositor headless
//! - Listing filters

use aicam::app::{AppState, CameraMode, SharedState, StreamController};
use aicam::backends::camera::{
    CameraBackend, FacingMode, Frame, LiveStream, StreamRequest, VideoSource,
};
use aicam::backends::inference::NoRuntime;
use aicam::backends::virtual_camera::{StillImageBackend, TestPatternBackend};
use aicam::config::Config;
use aicam::constants::{RENDER_PERIOD, Resolution};
use aicam::media::FilterType;
use aicam::pipelines::CapturedArtifact;
use aicam::pipelines::photo::{CaptureSource, PhotoPipeline, PostProcessingConfig};
use aicam::pipelines::video::{RecordingConfig, VideoRecorder};
use aicam::storage::{DirectoryGallery, GallerySink};
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

type CliResult = Result<(), Box<dyn Error>>;

const FIRST_FRAME_TIMEOUT: Duration = Duration::from_secs(5);

/// List all filters
pub fn list_filters() -> CliResult {
    println!("Available filters:");
    println!();
    for filter in FilterType::ALL {
        println!("  {:<10} {}", filter.id(), filter.display_name());
    }
    Ok(())
}

/// Take a photo from an image file
pub fn take_photo(
    input: PathBuf,
    filter: FilterType,
    enhance: bool,
    resolution: Resolution,
    output: Option<PathBuf>,
) -> CliResult {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let (width, height) = resolution.dimensions();
        let request = StreamRequest::new(FacingMode::Environment, width, height, false);
        let backend = StillImageBackend::new(&input);
        let stream = backend.open(request).await?;
        let frame = first_frame(&stream).await;
        stream.stop();
        let frame = frame?;
        println!("Source: {}x{}", frame.width, frame.height);

        let pipeline = PhotoPipeline::with_config(PostProcessingConfig {
            filter_type: filter,
            enhance,
            target_width: width,
            target_height: height,
        });

        println!("Capturing...");
        let artifact = pipeline.capture(frame, CaptureSource::LiveFrame).await?;
        println!("Captured: {}x{}", artifact.width, artifact.height);

        let path = save(artifact, output).await?;
        println!("Photo saved: {}", path.display());
        Ok::<_, Box<dyn Error>>(())
    })
}

/// Record a video from an image file or the test pattern
pub fn record_video(duration: u64, input: Option<PathBuf>, output: Option<PathBuf>) -> CliResult {
    // Set up Ctrl+C handler
    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_clone = Arc::clone(&stop_flag);
    ctrlc::set_handler(move || {
        stop_flag_clone.store(true, Ordering::SeqCst);
    })?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let backend = source_backend(input);
        let (width, height) = Resolution::Hd.dimensions();
        let request = StreamRequest::new(FacingMode::Environment, width, height, true);
        let stream = backend.open(request).await?;
        first_frame(&stream).await?;

        println!("Duration: {} seconds", duration);
        println!();
        println!("Recording... (press Ctrl+C to stop early)");
        let recorder = VideoRecorder::start(&stream, RecordingConfig::default())?;

        let target_duration = Duration::from_secs(duration);
        while recorder.elapsed() < target_duration {
            if stop_flag.load(Ordering::SeqCst) {
                println!();
                println!("Stopping early...");
                break;
            }

            // Print progress
            let elapsed = recorder.elapsed().as_secs();
            print!("\rRecording: {:02}:{:02}", elapsed / 60, elapsed % 60);
            std::io::Write::flush(&mut std::io::stdout())?;

            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        println!();

        let artifact = recorder.stop().await?;
        stream.stop();

        let path = save(artifact, output).await?;
        println!("Video saved: {}", path.display());
        Ok::<_, Box<dyn Error>>(())
    })
}

/// Run the stream controller for `ticks` render ticks and print stats
pub fn preview(ticks: u64, input: Option<PathBuf>, portrait: bool) -> CliResult {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let mode = if portrait {
            CameraMode::Portrait
        } else {
            CameraMode::Photo
        };
        let state = SharedState::new(AppState::new(Config::default()));
        state.set_mode(mode);

        let mut controller =
            StreamController::new(source_backend(input), Arc::new(NoRuntime), state);
        controller.start().await?;
        println!("Mode: {}", mode);

        let compositor = controller.compositor();
        let mut ticker = tokio::time::interval(RENDER_PERIOD);
        let stats = loop {
            ticker.tick().await;
            let stats = match compositor.lock() {
                Ok(c) => c.stats(),
                Err(_) => return Err("compositor lock poisoned".into()),
            };
            if stats.drawn() + stats.skipped >= ticks {
                break stats;
            }
        };
        controller.stop();

        let surface = controller.preview().borrow().as_ref().map(|f| f.dimensions());
        if let Some((width, height)) = surface {
            println!("Surface: {}x{}", width, height);
        }
        println!("Pass-through: {}", stats.pass_through);
        println!("Portrait:     {}", stats.portrait);
        println!("Failed:       {}", stats.failed);
        println!("Skipped:      {}", stats.skipped);
        Ok::<_, Box<dyn Error>>(())
    })
}

fn source_backend(input: Option<PathBuf>) -> Arc<dyn CameraBackend> {
    match input {
        Some(path) => {
            println!("Source: {}", path.display());
            Arc::new(StillImageBackend::new(path))
        }
        None => {
            println!("Source: test pattern");
            Arc::new(TestPatternBackend::new())
        }
    }
}

/// Wait for the stream's first frame
async fn first_frame(stream: &LiveStream) -> Result<Arc<Frame>, Box<dyn Error>> {
    let mut rx = stream.subscribe();
    let waited = tokio::time::timeout(FIRST_FRAME_TIMEOUT, async {
        rx.wait_for(|f| f.is_some()).await.map(|_| ())
    })
    .await;
    match waited {
        Ok(Ok(_)) => stream
            .current_frame()
            .ok_or_else(|| Box::<dyn Error>::from("Camera stream stopped")),
        Ok(Err(_)) => Err("Camera stream closed".into()),
        Err(_) => Err("Timed out waiting for first frame".into()),
    }
}

/// Write to `output`, or into the default gallery folders
async fn save(
    artifact: CapturedArtifact,
    output: Option<PathBuf>,
) -> Result<PathBuf, Box<dyn Error>> {
    if let Some(path) = output {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &artifact.data[..]).await?;
        return Ok(path);
    }

    let gallery = DirectoryGallery::default_location();
    gallery.append(artifact).await?;
    gallery
        .written_paths()
        .into_iter()
        .next()
        .ok_or_else(|| "Nothing was written".into())
}
