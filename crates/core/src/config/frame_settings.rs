use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::constants::{
    self, CANVAS_SIZE, CIRCLE_X, CIRCLE_Y, DEFAULT_DETECTION_PROFILE, DEFAULT_MIN_CONFIDENCE,
    DETECTION_CROP_SCALE, OUTPUT_FILENAME, OUTPUT_SIZE,
};

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read settings from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings JSON in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0}")]
    Invalid(String),
}

/// Tunable geometry and detector settings, persisted as JSON.
///
/// Defaults match the bundled frame artwork. Missing keys in a settings
/// file fall back to those defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameSettings {
    pub canvas_size: u32,
    pub output_size: u32,
    pub circle_x: f64,
    pub circle_y: f64,
    pub detection_crop_scale: f64,
    pub min_confidence: f64,
    pub detection_profile: String,
    pub model_url: Option<String>,
    pub output_filename: String,
}

impl Default for FrameSettings {
    fn default() -> Self {
        Self {
            canvas_size: CANVAS_SIZE,
            output_size: OUTPUT_SIZE,
            circle_x: CIRCLE_X,
            circle_y: CIRCLE_Y,
            detection_crop_scale: DETECTION_CROP_SCALE,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            detection_profile: DEFAULT_DETECTION_PROFILE.to_string(),
            model_url: None,
            output_filename: OUTPUT_FILENAME.to_string(),
        }
    }
}

impl FrameSettings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("PhotoFrame").join("settings.json"))
    }

    /// Loads the user settings file, falling back to defaults when it is
    /// missing or unreadable.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Ignoring settings file: {e}");
                Self::default()
            }
        }
    }

    /// Strict variant of [`load`](Self::load) for an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let json = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Self = serde_json::from_str(&json).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn radius(&self) -> f64 {
        constants::radius(self.output_size)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.canvas_size == 0 || self.output_size == 0 {
            return Err(SettingsError::Invalid(format!(
                "Canvas and output sizes must be positive, got {} and {}",
                self.canvas_size, self.output_size
            )));
        }
        let r = self.radius();
        let canvas = self.canvas_size as f64;
        if self.circle_x - r < 0.0
            || self.circle_y - r < 0.0
            || self.circle_x + r > canvas
            || self.circle_y + r > canvas
        {
            return Err(SettingsError::Invalid(format!(
                "Circle ({}, {}) with radius {r} does not fit a {}px canvas",
                self.circle_x, self.circle_y, self.canvas_size
            )));
        }
        if !(self.detection_crop_scale > 0.0 && self.detection_crop_scale <= 1.0) {
            return Err(SettingsError::Invalid(format!(
                "Detection crop scale must be in (0, 1], got {}",
                self.detection_crop_scale
            )));
        }
        if !(self.min_confidence > 0.0 && self.min_confidence <= 1.0) {
            return Err(SettingsError::Invalid(format!(
                "Confidence must be in (0, 1], got {}",
                self.min_confidence
            )));
        }
        if self.detection_profile != DEFAULT_DETECTION_PROFILE {
            return Err(SettingsError::Invalid(format!(
                "Only the '{DEFAULT_DETECTION_PROFILE}' detection profile is supported, got '{}'",
                self.detection_profile
            )));
        }
        if self.output_filename.is_empty() || self.output_filename.contains(['/', '\\']) {
            return Err(SettingsError::Invalid(format!(
                "Output filename must be a bare file name, got '{}'",
                self.output_filename
            )));
        }
        Ok(())
    }
}
