// SPDX-License-Identifier: MPL-2.0

//! Camera backend abstraction
//!
//! ```text
//! ┌─────────────────────┐
//! │  StreamController   │  ← Lifecycle, mode switching, camera flip
//! └──────────┬──────────┘
//!            │ open(StreamRequest)
//!            ▼
//! ┌─────────────────────┐
//! │  CameraBackend Trait│  ← Common interface
//! └──────────┬──────────┘
//!            │ FrameSender
//!            ▼
//! ┌─────────────────────┐
//! │     LiveStream      │  ← Latest-frame watch, read by compositor/recorder
//! └─────────────────────┘
//! ```

pub mod types;

pub use types::*;

use crate::errors::CameraError;
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Read-only view of a live video source
///
/// The frame compositor only reads through this trait; the stream itself is
/// owned by the stream controller.
pub trait VideoSource: Send + Sync {
    /// Source is producing frames
    fn is_ready(&self) -> bool;

    /// Dimensions of the most recent frame, (0, 0) before the first one
    fn dimensions(&self) -> (u32, u32);

    /// Most recent frame
    fn current_frame(&self) -> Option<Arc<Frame>>;
}

/// Camera backend trait
///
/// A backend turns a [`StreamRequest`] into a running [`LiveStream`], or
/// fails with a permission/availability error.
pub trait CameraBackend: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &str;

    /// Acquire a live stream
    fn open(&self, request: StreamRequest) -> BoxFuture<'_, Result<LiveStream, CameraError>>;
}

/// Producer half of a live stream
#[derive(Debug)]
pub struct FrameSender {
    tx: watch::Sender<Option<Arc<Frame>>>,
    sequence: AtomicU64,
}

impl FrameSender {
    /// Publish a frame, replacing the previous one
    ///
    /// Returns `false` once every stream handle has been dropped.
    pub fn send(&self, mut frame: Frame) -> bool {
        frame.sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        self.tx.send(Some(Arc::new(frame))).is_ok()
    }

    /// Whether any stream handle is still alive
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

struct StreamInner {
    request: StreamRequest,
    frames: watch::Receiver<Option<Arc<Frame>>>,
    stopped: AtomicBool,
    producer: Mutex<Option<JoinHandle<()>>>,
}

/// Consumer half of a live stream
///
/// Cheap to clone. Stopping any clone stops the stream for all of them.
#[derive(Clone)]
pub struct LiveStream {
    inner: Arc<StreamInner>,
}

impl std::fmt::Debug for LiveStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveStream")
            .field("request", &self.inner.request)
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

/// Create a connected sender/stream pair
pub fn stream_channel(request: StreamRequest) -> (FrameSender, LiveStream) {
    let (tx, rx) = watch::channel(None);
    let sender = FrameSender {
        tx,
        sequence: AtomicU64::new(0),
    };
    let stream = LiveStream {
        inner: Arc::new(StreamInner {
            request,
            frames: rx,
            stopped: AtomicBool::new(false),
            producer: Mutex::new(None),
        }),
    };
    (sender, stream)
}

impl LiveStream {
    /// Request this stream was opened with
    pub fn request(&self) -> StreamRequest {
        self.inner.request
    }

    /// Attach the task producing frames so `stop` can cancel it
    pub fn attach_producer(&self, handle: JoinHandle<()>) {
        if let Ok(mut producer) = self.inner.producer.lock() {
            if let Some(old) = producer.replace(handle) {
                old.abort();
            }
        }
    }

    /// New receiver observing every published frame
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<Frame>>> {
        self.inner.frames.clone()
    }

    /// Stop producing frames and release the camera
    pub fn stop(&self) {
        if self.inner.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Ok(mut producer) = self.inner.producer.lock() {
            if let Some(handle) = producer.take() {
                handle.abort();
            }
        }
        info!(facing = ?self.inner.request.facing_mode, "Camera stream stopped");
    }

    /// Whether `stop` has been called
    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }
}

impl VideoSource for LiveStream {
    fn is_ready(&self) -> bool {
        !self.is_stopped() && self.inner.frames.borrow().is_some()
    }

    fn dimensions(&self) -> (u32, u32) {
        self.inner
            .frames
            .borrow()
            .as_ref()
            .map(|f| f.dimensions())
            .unwrap_or((0, 0))
    }

    fn current_frame(&self) -> Option<Arc<Frame>> {
        if self.is_stopped() {
            return None;
        }
        self.inner.frames.borrow().clone()
    }
}

impl Drop for StreamInner {
    fn drop(&mut self) {
        if let Ok(mut producer) = self.producer.lock() {
            if let Some(handle) = producer.take() {
                debug!("Aborting frame producer of dropped stream");
                handle.abort();
            }
        }
    }
}
