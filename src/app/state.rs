// SPDX-License-Identifier: GPL-3.0-only

//! Application state management
//!
//! [`AppState`] is the explicit state object shared by the stream controller
//! and the capture arbiter. Persistence goes through a
//! [`SettingsStore`](crate::config::SettingsStore); nothing here is global.

use crate::config::Config;
use crate::constants::Resolution;
use crate::errors::CameraError;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

/// Camera mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CameraMode {
    #[default]
    Photo,
    Video,
    /// Low-light photo
    Night,
    /// Person segmentation with blurred background
    Portrait,
    /// Highest-resolution photo (108MP target, capped at capture)
    Ultra,
    /// Slow-motion video
    SloMo,
    Panorama,
}

impl CameraMode {
    pub const ALL: [CameraMode; 7] = [
        CameraMode::Photo,
        CameraMode::Video,
        CameraMode::Night,
        CameraMode::Portrait,
        CameraMode::Ultra,
        CameraMode::SloMo,
        CameraMode::Panorama,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            CameraMode::Photo => "photo",
            CameraMode::Video => "video",
            CameraMode::Night => "night",
            CameraMode::Portrait => "portrait",
            CameraMode::Ultra => "ultra",
            CameraMode::SloMo => "slo-mo",
            CameraMode::Panorama => "panorama",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.id() == id)
    }

    /// Modes that record video instead of taking stills
    pub fn is_video(&self) -> bool {
        matches!(self, CameraMode::Video | CameraMode::SloMo)
    }

    /// Whether the stream should include audio
    pub fn wants_audio(&self) -> bool {
        self.is_video()
    }

    pub fn is_portrait(&self) -> bool {
        *self == CameraMode::Portrait
    }

    /// Capture resolution for this mode given the configured one
    ///
    /// Ultra always targets 108MP; the capture cap still applies.
    pub fn target_resolution(&self, configured: Resolution) -> Resolution {
        match self {
            CameraMode::Ultra => Resolution::Mp108,
            _ => configured,
        }
    }
}

impl std::fmt::Display for CameraMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Session-wide state read by the controller and arbiter
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub mode: CameraMode,
    pub config: Config,
    /// Terminal camera error, shown to the user until the stream restarts
    pub error: Option<CameraError>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }
}

/// Shared handle to [`AppState`]
#[derive(Debug, Clone, Default)]
pub struct SharedState(Arc<RwLock<AppState>>);

impl SharedState {
    pub fn new(state: AppState) -> Self {
        Self(Arc::new(RwLock::new(state)))
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> AppState {
        match self.0.read() {
            Ok(state) => state.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Mutate the state in place
    pub fn update<R>(&self, f: impl FnOnce(&mut AppState) -> R) -> R {
        match self.0.write() {
            Ok(mut state) => f(&mut *state),
            Err(poisoned) => {
                warn!("App state lock poisoned, recovering");
                let mut state = poisoned.into_inner();
                f(&mut *state)
            }
        }
    }

    pub fn mode(&self) -> CameraMode {
        self.snapshot().mode
    }

    pub fn config(&self) -> Config {
        self.snapshot().config
    }

    pub fn error(&self) -> Option<CameraError> {
        self.snapshot().error
    }

    pub fn set_mode(&self, mode: CameraMode) {
        debug!(%mode, "Mode changed");
        self.update(|s| s.mode = mode);
    }

    pub fn set_config(&self, config: Config) {
        self.update(|s| s.config = config);
    }

    pub fn set_error(&self, error: Option<CameraError>) {
        self.update(|s| s.error = error);
    }
}
