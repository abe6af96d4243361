// SPDX-License-Identifier: MPL-2.0

//! Integration tests for configuration module

use aicam::config::{
    CaptureTimer, Config, FlashMode, JsonSettingsStore, MemorySettingsStore, SettingsStore,
};
use aicam::constants::Resolution;
use aicam::media::filters::FilterType;
use std::time::Duration;

#[test]
fn test_config_default() {
    let config = Config::default();

    assert_eq!(config.flash, FlashMode::Off);
    assert!(!config.grid);
    assert_eq!(config.timer, CaptureTimer::Off);
    assert_eq!(config.resolution, Resolution::FullHd);
    assert_eq!(config.filter, FilterType::None);
    assert!(config.ai_face_detection, "Face detection should be on by default");
    assert!(!config.ai_enhance, "Auto-enhance should be off by default");
}

#[test]
fn test_timer_values() {
    let seconds: Vec<u8> = CaptureTimer::ALL.iter().map(|t| t.seconds()).collect();
    assert_eq!(seconds, vec![0, 3, 5, 10]);
    assert_eq!(CaptureTimer::FiveSeconds.delay(), Duration::from_secs(5));
    assert!(CaptureTimer::try_from(4).is_err());
}

#[test]
fn test_partial_json_uses_defaults() {
    let config: Config =
        serde_json::from_str(r#"{"filter": "vintage", "timer": 3, "resolution": "108mp"}"#)
            .unwrap();
    assert_eq!(config.filter, FilterType::Vintage);
    assert_eq!(config.timer, CaptureTimer::ThreeSeconds);
    assert_eq!(config.resolution, Resolution::Mp108);
    assert!(config.dark_mode);
    assert!(config.upper_buttons.gallery);
}

#[test]
fn test_invalid_timer_rejected() {
    assert!(serde_json::from_str::<Config>(r#"{"timer": 7}"#).is_err());
}

#[test]
fn test_json_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonSettingsStore::new(dir.path().join("nested").join("settings.json"));

    // Nothing saved yet
    assert_eq!(store.load(), Config::default());

    let config = Config {
        filter: FilterType::Cool,
        ai_enhance: true,
        ..Config::default()
    };
    store.save(&config).unwrap();
    assert_eq!(store.load(), config);
}

#[test]
fn test_json_store_corrupt_file_falls_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(&path, "{not json").unwrap();

    let store = JsonSettingsStore::new(&path);
    assert_eq!(store.load(), Config::default());
}

#[test]
fn test_memory_store() {
    let store = MemorySettingsStore::default();
    let config = Config {
        grid: true,
        ..Config::default()
    };
    store.save(&config).unwrap();
    assert!(store.load().grid);
}
