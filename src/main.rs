// SPDX-License-Identifier: GPL-3.0-only

use aicam::FilterType;
use aicam::constants::Resolution;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "aicam")]
#[command(about = "AI camera frame pipeline: capture, filters and portrait compositing")]
#[command(version = env!("GIT_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Take a photo from an image file
    Photo {
        /// Image to use as the camera source
        #[arg(short, long)]
        input: PathBuf,

        /// Color filter (none, vintage, cinematic, bw, warm, cool)
        #[arg(short, long, default_value = "none")]
        filter: FilterType,

        /// Apply auto-enhance before the filter
        #[arg(short, long)]
        enhance: bool,

        /// Target resolution (hd, fullhd, 4k, 108mp)
        #[arg(short, long, default_value = "fullhd", value_parser = parse_resolution)]
        resolution: Resolution,

        /// Output file path (default: ~/Pictures/photo_TIMESTAMP.jpg)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Record a video
    Video {
        /// Recording duration in seconds
        #[arg(short, long, default_value = "10")]
        duration: u64,

        /// Image to use as the camera source (default: test pattern)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output file path (default: ~/Videos/video_TIMESTAMP.webm)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run the compositor and report tick outcomes
    Preview {
        /// Number of render ticks to run
        #[arg(short, long, default_value = "60")]
        ticks: u64,

        /// Image to use as the camera source (default: test pattern)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Render in portrait mode
        #[arg(short, long)]
        portrait: bool,
    },

    /// List available filters
    Filters,
}

fn parse_resolution(s: &str) -> Result<Resolution, String> {
    Resolution::from_id(s).ok_or_else(|| format!("unknown resolution '{}'", s))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=aicam=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Photo {
            input,
            filter,
            enhance,
            resolution,
            output,
        } => cli::take_photo(input, filter, enhance, resolution, output),
        Commands::Video {
            duration,
            input,
            output,
        } => cli::record_video(duration, input, output),
        Commands::Preview {
            ticks,
            input,
            portrait,
        } => cli::preview(ticks, input, portrait),
        Commands::Filters => cli::list_filters(),
    }
}
