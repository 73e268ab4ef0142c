//! Tracing session settings

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use shared::Units;

use crate::detect::DetectSettings;
use crate::snap::SnapSettings;
use crate::units::DEFAULT_METERS_SPAN_THRESHOLD;

/// Errors from reading or writing settings
#[derive(Debug)]
pub enum SettingsError {
    /// No config directory on this platform
    NoConfigDir,
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for SettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsError::NoConfigDir => write!(f, "No configuration directory available"),
            SettingsError::Io(e) => write!(f, "Settings I/O error: {}", e),
            SettingsError::Json(e) => write!(f, "Settings JSON error: {}", e),
        }
    }
}

impl std::error::Error for SettingsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SettingsError::NoConfigDir => None,
            SettingsError::Io(e) => Some(e),
            SettingsError::Json(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for SettingsError {
    fn from(e: std::io::Error) -> Self {
        SettingsError::Io(e)
    }
}

impl From<serde_json::Error> for SettingsError {
    fn from(e: serde_json::Error) -> Self {
        SettingsError::Json(e)
    }
}

/// All tunables of a tracing session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceSettings {
    /// Display units for lengths
    pub units: Units,
    pub snap: SnapSettings,
    pub detect: DetectSettings,
    /// Drawings with a smaller span are assumed to be in meters
    pub meters_span_threshold: f64,
    /// Distance below which two model points coincide
    pub point_tolerance: f64,
}

impl Default for TraceSettings {
    fn default() -> Self {
        Self {
            units: Units::default(),
            snap: SnapSettings::default(),
            detect: DetectSettings::default(),
            meters_span_threshold: DEFAULT_METERS_SPAN_THRESHOLD,
            point_tolerance: 1e-6,
        }
    }
}

impl TraceSettings {
    /// `settings.json` under the platform config directory
    pub fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "scaffold", "perimeter")
            .map(|dirs| dirs.config_dir().join("settings.json"))
    }

    /// Load settings from the config file, falling back to defaults
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path).unwrap_or_else(|e| {
                tracing::debug!("Using default settings: {}", e);
                Self::default()
            }),
            None => Self::default(),
        }
    }

    /// Save settings to the config file
    pub fn save(&self) -> Result<(), SettingsError> {
        let path = Self::config_path().ok_or(SettingsError::NoConfigDir)?;
        self.save_to(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        tracing::info!("Settings saved to {}", path.display());
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = TraceSettings::default();
        assert_eq!(s.units, Units::Millimeters);
        assert_eq!(s.meters_span_threshold, 100.0);
        assert_eq!(s.detect.tolerance, 1.0);
        assert!(!s.snap.hard_lock);
    }

    #[test]
    fn test_json_roundtrip() {
        let mut s = TraceSettings::default();
        s.units = Units::Meters;
        s.snap.hard_lock = true;
        s.detect.tolerance = 2.5;
        let json = s.to_json().unwrap();
        assert_eq!(TraceSettings::from_json(&json).unwrap(), s);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let s = TraceSettings::from_json(r#"{ "units": "meters", "snap": { "hard_lock": true } }"#).unwrap();
        assert_eq!(s.units, Units::Meters);
        assert!(s.snap.hard_lock);
        assert_eq!(s.snap.angle_tolerance_deg, 5.0);
        assert_eq!(s.point_tolerance, 1e-6);
    }

    #[test]
    fn test_invalid_json() {
        let err = TraceSettings::from_json("{ not json").unwrap_err();
        assert!(matches!(err, SettingsError::Json(_)));
        assert!(err.to_string().starts_with("Settings JSON error"));
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = std::env::temp_dir().join(format!("perimeter-settings-{}", std::process::id()));
        let path = dir.join("settings.json");
        let mut s = TraceSettings::default();
        s.point_tolerance = 0.01;
        s.save_to(&path).unwrap();
        assert_eq!(TraceSettings::load_from(&path).unwrap(), s);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_load_missing_file() {
        let path = std::env::temp_dir().join("perimeter-settings-does-not-exist.json");
        assert!(matches!(TraceSettings::load_from(&path), Err(SettingsError::Io(_))));
    }
}
