// SPDX-License-Identifier: MPL-2.0

//! AI Camera - real-time frame processing core for a camera app
//!
//! This library provides the frame pipeline behind the camera UI: live stream
//! acquisition, per-frame compositing with portrait background blur, face and
//! person inference adapters, color filters, photo capture and video
//! recording into a gallery.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`app`]: Stream lifecycle, compositor, inference loops, capture arbiter
//! - [`backends`]: Camera and model runtime abstraction
//! - [`media`]: Filters, portrait compositing, JPEG and thumbnails
//! - [`pipelines`]: Photo and video capture pipelines
//! - [`config`]: User settings and their persistence
//! - [`storage`]: Gallery sinks
//!
//! # Example
//!
//! ```ignore
//! let state = SharedState::new(AppState::new(Config::default()));
//! let mut controller = StreamController::new(
//!     Arc::new(TestPatternBackend::new()),
//!     Arc::new(NoRuntime),
//!     state.clone(),
//! );
//! controller.start().await?;
//! ```

pub mod app;
pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod media;
pub mod pipelines;
pub mod storage;

// Re-export commonly used types
pub use app::{AppState, CameraMode, CaptureArbiter, CaptureEvent, SharedState, StreamController};
pub use config::Config;
pub use constants::Resolution;
pub use errors::{AppError, AppResult};
pub use media::FilterType;
