// SPDX-License-Identifier: GPL-3.0-only

//! Frame compositor
//!
//! One tick reads the newest frame from the video source and draws it to the
//! display surface, either unmodified (pass-through) or, in portrait mode,
//! blurred with the sharp person matted back on top.
//!
//! The tick never waits on inference. It reads whichever segmentation mask
//! is currently published, and only uses it when its dimensions exactly
//! match the frame. Anything else renders pass-through.

use crate::app::frame_processor::task::{Cadence, FrameTask, LoopAction};
use crate::app::frame_processor::tasks::MaskReceiver;
use crate::backends::camera::{Frame, VideoSource};
use crate::constants::{PORTRAIT_BLUR_RADIUS, RENDER_PERIOD};
use crate::media::portrait::composite_portrait;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{debug, trace, warn};

/// Result of one compositor tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Source not ready; nothing drawn
    Skipped,
    /// Frame drawn unmodified
    PassThrough,
    /// Blur-and-matte composite drawn
    Portrait,
    /// Compositing failed; frame drawn unmodified
    Failed,
}

/// Per-outcome tick counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompositorStats {
    pub skipped: u64,
    pub pass_through: u64,
    pub portrait: u64,
    pub failed: u64,
}

impl CompositorStats {
    fn record(&mut self, outcome: TickOutcome) {
        match outcome {
            TickOutcome::Skipped => self.skipped += 1,
            TickOutcome::PassThrough => self.pass_through += 1,
            TickOutcome::Portrait => self.portrait += 1,
            TickOutcome::Failed => self.failed += 1,
        }
    }

    /// Ticks that drew something
    pub fn drawn(&self) -> u64 {
        self.pass_through + self.portrait + self.failed
    }
}

/// Render target
#[derive(Debug, Clone, Default)]
pub struct DisplaySurface {
    pub width: u32,
    pub height: u32,
    /// How many times the surface was (re)allocated
    pub resizes: u64,
    /// Last drawn frame
    pub content: Option<Arc<Frame>>,
}

impl DisplaySurface {
    fn resize_to(&mut self, width: u32, height: u32) {
        if (self.width, self.height) == (width, height) {
            return;
        }
        debug!(
            from_width = self.width,
            from_height = self.height,
            width,
            height,
            "Resizing display surface"
        );
        self.width = width;
        self.height = height;
        self.resizes += 1;
        self.content = None;
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_none() || self.width == 0 || self.height == 0
    }
}

/// Receiver of the composited output
pub type SurfaceReceiver = watch::Receiver<Option<Arc<Frame>>>;

/// The render-loop state
pub struct FrameCompositor {
    surface: DisplaySurface,
    portrait: bool,
    masks: Option<MaskReceiver>,
    output: watch::Sender<Option<Arc<Frame>>>,
    stats: CompositorStats,
}

impl FrameCompositor {
    pub fn new() -> Self {
        let (output, _) = watch::channel(None);
        Self {
            surface: DisplaySurface::default(),
            portrait: false,
            masks: None,
            output,
            stats: CompositorStats::default(),
        }
    }

    /// Enable or disable portrait compositing
    ///
    /// `masks` is the segmenter's output; `None` means no segmenter is
    /// available and portrait ticks render pass-through.
    pub fn set_portrait(&mut self, enabled: bool, masks: Option<MaskReceiver>) {
        debug!(enabled, has_segmenter = masks.is_some(), "Portrait compositing");
        self.portrait = enabled;
        self.masks = if enabled { masks } else { None };
    }

    pub fn is_portrait(&self) -> bool {
        self.portrait
    }

    pub fn surface(&self) -> &DisplaySurface {
        &self.surface
    }

    pub fn stats(&self) -> CompositorStats {
        self.stats
    }

    /// Receiver observing every drawn frame
    pub fn subscribe(&self) -> SurfaceReceiver {
        self.output.subscribe()
    }

    /// Render one tick
    pub fn tick(&mut self, source: &dyn VideoSource) -> TickOutcome {
        let outcome = self.render(source);
        self.stats.record(outcome);
        trace!(?outcome, "Compositor tick");
        outcome
    }

    fn render(&mut self, source: &dyn VideoSource) -> TickOutcome {
        if !source.is_ready() {
            return TickOutcome::Skipped;
        }
        let (width, height) = source.dimensions();
        if width == 0 || height == 0 {
            return TickOutcome::Skipped;
        }
        let Some(frame) = source.current_frame() else {
            return TickOutcome::Skipped;
        };

        self.surface.resize_to(frame.width, frame.height);

        if !self.portrait {
            self.draw(frame);
            return TickOutcome::PassThrough;
        }

        let mask = self.masks.as_ref().and_then(|rx| rx.borrow().clone());
        let Some(mask) = mask else {
            self.draw(frame);
            return TickOutcome::PassThrough;
        };
        if !mask.matches(frame.width, frame.height) {
            debug!(
                mask_width = mask.width,
                mask_height = mask.height,
                frame_width = frame.width,
                frame_height = frame.height,
                "Mask does not match frame, rendering pass-through"
            );
            self.draw(frame);
            return TickOutcome::PassThrough;
        }

        match composite_portrait(&frame, &mask, PORTRAIT_BLUR_RADIUS) {
            Ok(composited) => {
                self.draw(Arc::new(composited));
                TickOutcome::Portrait
            }
            Err(e) => {
                warn!(error = %e, "Portrait composite failed, rendering pass-through");
                self.draw(frame);
                TickOutcome::Failed
            }
        }
    }

    fn draw(&mut self, frame: Arc<Frame>) {
        self.surface.content = Some(Arc::clone(&frame));
        self.output.send_replace(Some(frame));
    }
}

impl Default for FrameCompositor {
    fn default() -> Self {
        Self::new()
    }
}

/// Start the render loop at the display refresh cadence
pub fn spawn_render_loop(
    compositor: Arc<Mutex<FrameCompositor>>,
    source: Arc<dyn VideoSource>,
) -> FrameTask {
    FrameTask::spawn("render", Cadence::Fixed(RENDER_PERIOD), move |_token| {
        match compositor.lock() {
            Ok(mut compositor) => {
                compositor.tick(source.as_ref());
            }
            Err(_) => warn!("Compositor lock poisoned, skipping tick"),
        }
        async { LoopAction::Continue }
    })
}
