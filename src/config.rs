// SPDX-License-Identifier: GPL-3.0-only

use crate::constants::Resolution;
use crate::errors::{AppError, AppResult};
use crate::media::filters::FilterType;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Current settings schema version
pub const CONFIG_VERSION: u32 = 1;

/// Flash setting
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashMode {
    #[default]
    Off,
    On,
    Auto,
}

/// Pre-capture self timer
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum CaptureTimer {
    #[default]
    Off,
    ThreeSeconds,
    FiveSeconds,
    TenSeconds,
}

impl CaptureTimer {
    pub const ALL: [CaptureTimer; 4] = [
        CaptureTimer::Off,
        CaptureTimer::ThreeSeconds,
        CaptureTimer::FiveSeconds,
        CaptureTimer::TenSeconds,
    ];

    pub fn seconds(&self) -> u8 {
        match self {
            CaptureTimer::Off => 0,
            CaptureTimer::ThreeSeconds => 3,
            CaptureTimer::FiveSeconds => 5,
            CaptureTimer::TenSeconds => 10,
        }
    }

    /// Delay between trigger and frame grab
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.seconds() as u64)
    }
}

impl TryFrom<u8> for CaptureTimer {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(CaptureTimer::Off),
            3 => Ok(CaptureTimer::ThreeSeconds),
            5 => Ok(CaptureTimer::FiveSeconds),
            10 => Ok(CaptureTimer::TenSeconds),
            other => Err(format!("invalid timer value {} (expected 0, 3, 5 or 10)", other)),
        }
    }
}

impl From<CaptureTimer> for u8 {
    fn from(timer: CaptureTimer) -> Self {
        timer.seconds()
    }
}

/// Visual theme of the camera controls
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraTheme {
    #[default]
    Minimal,
    Iphone,
    Samsung,
}

/// Which shortcut buttons are shown above the preview
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct UpperButtons {
    pub flash: bool,
    pub grid: bool,
    pub timer: bool,
    pub gallery: bool,
}

impl Default for UpperButtons {
    fn default() -> Self {
        Self {
            flash: true,
            grid: true,
            timer: true,
            gallery: true,
        }
    }
}

/// Persisted camera settings
///
/// Read by the stream controller and capture arbiter at call time. Unknown
/// or missing fields fall back to their defaults.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub version: u32,
    pub flash: FlashMode,
    /// Show the rule-of-thirds grid overlay
    pub grid: bool,
    pub timer: CaptureTimer,
    /// Target capture resolution (capped before acquisition)
    pub resolution: Resolution,
    pub theme: CameraTheme,
    /// Filter applied at capture time
    pub filter: FilterType,
    pub dark_mode: bool,
    pub ai_face_detection: bool,
    pub ai_scene_detection: bool,
    /// Apply auto-enhance before the filter
    pub ai_enhance: bool,
    pub ai_stabilization: bool,
    pub upper_buttons: UpperButtons,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            flash: FlashMode::Off,
            grid: false,
            timer: CaptureTimer::Off,
            resolution: Resolution::FullHd,
            theme: CameraTheme::Minimal,
            filter: FilterType::None,
            dark_mode: true,
            ai_face_detection: true,
            ai_scene_detection: true,
            ai_enhance: false,
            ai_stabilization: true,
            upper_buttons: UpperButtons::default(),
        }
    }
}

/// Narrow persistence interface for [`Config`]
pub trait SettingsStore: Send + Sync {
    /// Load settings, falling back to defaults when nothing usable is stored
    fn load(&self) -> Config;

    /// Persist settings
    fn save(&self, config: &Config) -> AppResult<()>;
}

/// Settings kept in memory only
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    config: Mutex<Config>,
}

impl MemorySettingsStore {
    pub fn new(config: Config) -> Self {
        Self {
            config: Mutex::new(config),
        }
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> Config {
        self.config
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }

    fn save(&self, config: &Config) -> AppResult<()> {
        let mut guard = self
            .config
            .lock()
            .map_err(|_| AppError::Config("settings lock poisoned".to_string()))?;
        *guard = config.clone();
        Ok(())
    }
}

/// Settings stored as pretty-printed JSON
#[derive(Debug, Clone)]
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<config dir>/aicam/settings.json`
    pub fn default_location() -> Self {
        let base = dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")));
        Self::new(base.join("aicam").join("settings.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for JsonSettingsStore {
    fn load(&self) -> Config {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No settings file, using defaults");
                return Config::default();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read settings, using defaults");
                return Config::default();
            }
        };

        match serde_json::from_str::<Config>(&contents) {
            Ok(config) => {
                if config.version != CONFIG_VERSION {
                    info!(
                        stored = config.version,
                        current = CONFIG_VERSION,
                        "Settings version changed, missing fields use defaults"
                    );
                }
                config
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Corrupt settings file, using defaults");
                Config::default()
            }
        }
    }

    fn save(&self, config: &Config) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut config = config.clone();
        config.version = CONFIG_VERSION;
        let json = serde_json::to_string_pretty(&config)?;
        std::fs::write(&self.path, json)?;
        debug!(path = %self.path.display(), "Settings saved");
        Ok(())
    }
}
