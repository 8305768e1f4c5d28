//! # Configuration Module
//!
//! Optional settings read from `calculator_config.json` in the working
//! directory. Every field has a default, so a partial file is fine and a
//! missing file means all defaults. Nothing is ever written back.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::theme::ThemeMode;
use crate::voice::CaptureSettings;

/// File name looked up in the working directory.
pub const CONFIG_FILE: &str = "calculator_config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalcConfig {
    /// Speech-to-text endpoint accepting a multipart WAV upload.
    pub speech_endpoint: String,
    pub request_timeout_secs: u64,
    pub max_capture_secs: f32,
    pub trailing_silence_secs: f32,
    pub start_theme: ThemeMode,
}

impl Default for CalcConfig {
    fn default() -> Self {
        Self {
            speech_endpoint: "http://127.0.0.1:8080/inference".to_string(),
            request_timeout_secs: 15,
            max_capture_secs: 8.0,
            trailing_silence_secs: 1.2,
            start_theme: ThemeMode::Dark,
        }
    }
}

impl CalcConfig {
    /// Capture limits; invalid durations fall back to the defaults.
    pub fn capture_settings(&self) -> CaptureSettings {
        let defaults = CaptureSettings::default();
        CaptureSettings {
            max_capture: positive_secs(self.max_capture_secs).unwrap_or(defaults.max_capture),
            trailing_silence: positive_secs(self.trailing_silence_secs)
                .unwrap_or(defaults.trailing_silence),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

fn positive_secs(secs: f32) -> Option<Duration> {
    Duration::try_from_secs_f32(secs)
        .ok()
        .filter(|d| !d.is_zero())
}

/// Reads the configuration at `path`. A missing file yields defaults.
pub fn load_config(path: impl AsRef<Path>) -> Result<CalcConfig> {
    let path = path.as_ref();
    let data = match std::fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(CalcConfig::default()),
        Err(e) => return Err(e).with_context(|| format!("Failed to read {}", path.display())),
    };
    serde_json::from_str(&data).with_context(|| format!("Malformed settings in {}", path.display()))
}

/// Like [`load_config`], but logs a warning and uses defaults on error.
pub fn load_or_default(path: impl AsRef<Path>) -> CalcConfig {
    match load_config(path) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(target: "calc::config", "Using default settings: {:#}", e);
            CalcConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn scratch_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("calc-core-{}-{}", std::process::id(), name));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn missing_file_gives_defaults() {
        let path = std::env::temp_dir().join("calc-core-does-not-exist.json");
        assert_eq!(load_config(&path).unwrap(), CalcConfig::default());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let path = scratch_file(
            "partial.json",
            r#"{ "start_theme": "light", "max_capture_secs": 4.5 }"#,
        );
        let config = load_config(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.start_theme, ThemeMode::Light);
        assert_eq!(config.max_capture_secs, 4.5);
        assert_eq!(config.speech_endpoint, CalcConfig::default().speech_endpoint);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let path = scratch_file("broken.json", "{ not json");
        assert!(load_config(&path).is_err());
        assert_eq!(load_or_default(&path), CalcConfig::default());
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn invalid_durations_fall_back() {
        let config = CalcConfig {
            max_capture_secs: -1.0,
            trailing_silence_secs: f32::NAN,
            request_timeout_secs: 0,
            ..CalcConfig::default()
        };
        assert_eq!(config.capture_settings(), CaptureSettings::default());
        assert_eq!(config.request_timeout(), Duration::from_secs(1));

        let custom = CalcConfig {
            max_capture_secs: 3.0,
            ..CalcConfig::default()
        };
        assert_eq!(custom.capture_settings().max_capture, Duration::from_secs(3));
    }
}
