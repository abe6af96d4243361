// SPDX-License-Identifier: GPL-3.0-only

//! Person segmentation task
//!
//! Push-style: frames are submitted on a fixed cadence and each completed
//! inference replaces the published [`SegmentationMask`]. The compositor only
//! ever reads the latest mask, which may lag the current frame.
//!
//! At most one inference is in flight; frames submitted while the model is
//! busy are dropped rather than queued.

use crate::app::frame_processor::task::{Cadence, CancelToken, FrameTask, LoopAction};
use crate::app::frame_processor::types::SegmentationMask;
use crate::backends::camera::{Frame, VideoSource};
use crate::backends::inference::{InferenceModel, InferenceOutput, ModelOptions, ModelRuntime};
use crate::constants::SEGMENTATION_PERIOD;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// Latest published mask, `None` until the first successful inference
pub type MaskReceiver = watch::Receiver<Option<Arc<SegmentationMask>>>;

struct SegmenterInner {
    model: Arc<dyn InferenceModel>,
    masks: watch::Sender<Option<Arc<SegmentationMask>>>,
    token: CancelToken,
    in_flight: AtomicBool,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl SegmenterInner {
    /// Replace the published mask unless the segmenter was torn down
    ///
    /// The cancellation check runs under the channel's write lock, so it
    /// cannot interleave with teardown clearing the mask.
    fn publish(&self, mask: SegmentationMask) -> bool {
        let mask = Arc::new(mask);
        self.masks.send_if_modified(|current| {
            if self.token.is_cancelled() {
                return false;
            }
            *current = Some(mask);
            true
        })
    }
}

/// Person segmenter backed by an inference model
#[derive(Clone)]
pub struct PersonSegmenter {
    inner: Arc<SegmenterInner>,
}

impl PersonSegmenter {
    /// Load the segmentation model
    ///
    /// Returns `None` when the runtime cannot provide one; portrait mode then
    /// renders pass-through.
    pub async fn initialize(runtime: &dyn ModelRuntime) -> Option<Self> {
        match runtime.initialize(ModelOptions::segmentation()).await {
            Ok(model) => {
                info!(runtime = runtime.name(), "Person segmentation ready");
                Some(Self::from_model(model))
            }
            Err(e) => {
                warn!(runtime = runtime.name(), error = %e, "Person segmentation unavailable");
                None
            }
        }
    }

    /// Wrap an already loaded model
    pub fn from_model(model: Arc<dyn InferenceModel>) -> Self {
        let (masks, _) = watch::channel(None);
        Self {
            inner: Arc::new(SegmenterInner {
                model,
                masks,
                token: CancelToken::new(),
                in_flight: AtomicBool::new(false),
                pending: Mutex::new(None),
            }),
        }
    }

    /// Most recently published mask
    pub fn latest_mask(&self) -> Option<Arc<SegmentationMask>> {
        self.inner.masks.borrow().clone()
    }

    /// Receiver observing mask replacements
    pub fn subscribe(&self) -> MaskReceiver {
        self.inner.masks.subscribe()
    }

    /// Whether an inference is currently running
    pub fn is_busy(&self) -> bool {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    /// Submit a frame for segmentation
    ///
    /// Returns `false` if the frame was dropped because an inference is
    /// already running or the segmenter was torn down.
    pub fn submit_frame(&self, frame: Arc<Frame>) -> bool {
        if self.is_closed() {
            return false;
        }
        if self
            .inner
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            trace!("Segmentation busy, dropping frame");
            return false;
        }

        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            let sequence = frame.sequence;
            let result = inner.model.infer(frame).await;
            inner.in_flight.store(false, Ordering::SeqCst);

            if inner.token.is_cancelled() {
                debug!(sequence, "Dropping mask from torn-down segmenter");
                return;
            }

            let mask = match result {
                Ok(InferenceOutput::Mask(raw)) => SegmentationMask::from_raw(raw),
                Ok(other) => {
                    warn!(kind = other.kind(), "Segmentation model returned unexpected output");
                    return;
                }
                Err(e) => {
                    debug!(error = %e, "Segmentation failed");
                    return;
                }
            };

            match mask {
                Ok(mask) => {
                    let (width, height) = (mask.width, mask.height);
                    if inner.publish(mask) {
                        trace!(sequence, width, height, "Published segmentation mask");
                    } else {
                        debug!(sequence, "Dropping mask from torn-down segmenter");
                    }
                }
                Err(e) => warn!(error = %e, "Rejected segmentation mask"),
            }
        });

        if let Ok(mut pending) = self.inner.pending.lock() {
            *pending = Some(handle);
        }
        true
    }

    /// Cancel in-flight work, release the model and clear the mask
    ///
    /// No mask is published after this returns.
    pub fn teardown(&self) {
        if self.inner.token.is_cancelled() {
            return;
        }
        self.inner.token.cancel();
        if let Ok(mut pending) = self.inner.pending.lock()
            && let Some(handle) = pending.take()
        {
            handle.abort();
        }
        self.inner.in_flight.store(false, Ordering::SeqCst);
        self.inner.model.close();
        self.inner.masks.send_replace(None);
        info!("Person segmentation torn down");
    }
}

/// Start the periodic frame push for portrait mode
pub fn spawn_segmentation_loop(
    segmenter: PersonSegmenter,
    source: Arc<dyn VideoSource>,
) -> FrameTask {
    FrameTask::spawn(
        "segmentation",
        Cadence::Fixed(SEGMENTATION_PERIOD),
        move |token| {
            let action = if token.is_cancelled() || segmenter.is_closed() {
                LoopAction::Stop
            } else {
                if source.is_ready()
                    && let Some(frame) = source.current_frame()
                {
                    segmenter.submit_frame(frame);
                }
                LoopAction::Continue
            };
            async move { action }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::inference::{MaskValues, RawMask};
    use crate::errors::InferenceError;
    use futures::future::BoxFuture;
    use std::time::Duration;

    /// Model that takes `delay` and returns an all-foreground mask
    struct SlowMask {
        delay: Duration,
    }

    impl InferenceModel for SlowMask {
        fn infer(&self, frame: Arc<Frame>) -> BoxFuture<'_, Result<InferenceOutput, InferenceError>> {
            let delay = self.delay;
            Box::pin(async move {
                tokio::time::sleep(delay).await;
                let len = (frame.width * frame.height) as usize;
                Ok(InferenceOutput::Mask(RawMask {
                    width: frame.width,
                    height: frame.height,
                    values: MaskValues::Confidence(vec![0.9; len]),
                }))
            })
        }
    }

    fn frame() -> Arc<Frame> {
        Arc::new(Frame::solid(8, 4, [1, 2, 3, 255]))
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_publishes_mask() {
        let segmenter = PersonSegmenter::from_model(Arc::new(SlowMask {
            delay: Duration::from_millis(30),
        }));
        let mut rx = segmenter.subscribe();
        assert!(segmenter.submit_frame(frame()));

        rx.changed().await.unwrap();
        let mask = segmenter.latest_mask().unwrap();
        assert!(mask.matches(8, 4));
        assert_eq!(mask.coverage(), 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_busy_drops_frames() {
        let segmenter = PersonSegmenter::from_model(Arc::new(SlowMask {
            delay: Duration::from_millis(200),
        }));
        assert!(segmenter.submit_frame(frame()));
        assert!(segmenter.is_busy());
        assert!(!segmenter.submit_frame(frame()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_drops_in_flight_result() {
        let segmenter = PersonSegmenter::from_model(Arc::new(SlowMask {
            delay: Duration::from_millis(50),
        }));
        assert!(segmenter.submit_frame(frame()));
        segmenter.teardown();

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(segmenter.latest_mask().is_none());
        assert!(!segmenter.submit_frame(frame()));
    }

    fn full_mask() -> SegmentationMask {
        SegmentationMask::from_raw(RawMask {
            width: 8,
            height: 4,
            values: MaskValues::Binary(vec![1; 32]),
        })
        .unwrap()
    }

    #[test]
    fn test_publish_refused_after_teardown() {
        let segmenter = PersonSegmenter::from_model(Arc::new(SlowMask {
            delay: Duration::ZERO,
        }));
        assert!(segmenter.inner.publish(full_mask()));
        assert!(segmenter.latest_mask().is_some());

        segmenter.teardown();
        assert!(!segmenter.inner.publish(full_mask()));
        assert!(segmenter.latest_mask().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_teardown_racing_inference_leaves_no_mask() {
        for _ in 0..200 {
            let segmenter = PersonSegmenter::from_model(Arc::new(SlowMask {
                delay: Duration::ZERO,
            }));
            assert!(segmenter.submit_frame(frame()));
            tokio::task::yield_now().await;
            segmenter.teardown();

            tokio::time::sleep(Duration::from_millis(1)).await;
            assert!(segmenter.latest_mask().is_none());
        }
    }
}
