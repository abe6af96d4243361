// SPDX-License-Identifier: MPL-2.0

//! Lifecycle management for frame processing loops
//!
//! Render, face detection and segmentation each run as their own
//! [`FrameTask`]. A task is started, runs until its body returns
//! [`LoopAction::Stop`] or it is cancelled, and is never restarted; callers
//! start a fresh task instead.
//!
//! Every task carries a [`CancelToken`]. Work that completes after
//! cancellation (an inference call that resolves late) must check the token
//! before publishing, so stale results are dropped.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Action returned by a loop body to control loop behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    /// Continue running the loop
    Continue,
    /// Stop the loop gracefully
    Stop,
}

/// How iterations are scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// Start an iteration every period, regardless of how long the body took.
    /// Ticks missed while the body was running are skipped.
    Fixed(Duration),
    /// Wait this long after each iteration completes (self-rescheduling)
    AfterCompletion(Duration),
}

/// Lifecycle state of a [`FrameTask`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Running,
    /// Body returned [`LoopAction::Stop`]
    Finished,
    Cancelled,
}

/// Shared cancellation flag
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Controller for one running loop
///
/// Dropping the controller cancels the loop.
pub struct FrameTask {
    name: String,
    token: CancelToken,
    handle: Option<JoinHandle<()>>,
}

impl FrameTask {
    /// Spawn a loop calling `body` according to `cadence`
    ///
    /// `body` receives the task's token so it can check for cancellation
    /// after any await point.
    pub fn spawn<F, Fut>(name: &str, cadence: Cadence, mut body: F) -> Self
    where
        F: FnMut(CancelToken) -> Fut + Send + 'static,
        Fut: Future<Output = LoopAction> + Send + 'static,
    {
        let token = CancelToken::new();
        let loop_token = token.clone();
        let loop_name = name.to_string();

        info!(name = %name, ?cadence, "Starting frame task");

        let handle = tokio::spawn(async move {
            let mut ticker = match cadence {
                Cadence::Fixed(period) => {
                    let mut ticker = tokio::time::interval(period);
                    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                    Some(ticker)
                }
                Cadence::AfterCompletion(_) => None,
            };

            loop {
                if let Some(ticker) = ticker.as_mut() {
                    ticker.tick().await;
                }
                if loop_token.is_cancelled() {
                    debug!(name = %loop_name, "Cancel signal received");
                    break;
                }

                if body(loop_token.clone()).await == LoopAction::Stop {
                    debug!(name = %loop_name, "Loop requested stop");
                    break;
                }

                if let Cadence::AfterCompletion(pause) = cadence {
                    tokio::time::sleep(pause).await;
                }
            }

            debug!(name = %loop_name, "Frame task exiting");
        });

        Self {
            name: name.to_string(),
            token,
            handle: Some(handle),
        }
    }

    /// Task name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Token shared with the loop body
    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }

    /// Current lifecycle state
    pub fn state(&self) -> TaskState {
        if self.token.is_cancelled() {
            TaskState::Cancelled
        } else if self.handle.as_ref().is_none_or(|h| h.is_finished()) {
            TaskState::Finished
        } else {
            TaskState::Running
        }
    }

    /// Whether the loop is still scheduled
    pub fn is_running(&self) -> bool {
        self.state() == TaskState::Running
    }

    /// Cancel the loop and any iteration in flight
    ///
    /// Idempotent. After this returns the body will not be polled again.
    pub fn cancel(&mut self) {
        if !self.token.is_cancelled() {
            debug!(name = %self.name, "Cancelling frame task");
        }
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    /// Wait for the loop to end on its own
    pub async fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for FrameTask {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.cancel();
        }
    }
}

impl std::fmt::Debug for FrameTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameTask")
            .field("name", &self.name)
            .field("state", &self.state())
            .finish()
    }
}
