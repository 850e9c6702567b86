use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::shared::constants::{
    APP_DIR_NAME, CASCADE_MIN_FACE_SIZE, CASCADE_MIN_NEIGHBORS, CASCADE_SCALE_FACTOR,
    GEOLOCATION_URL, HAND_CONFIDENCE, MAX_HANDS, TICKS_PER_SECOND,
};

/// User-tunable runtime settings, read from a JSON file.
///
/// Missing keys fall back to their defaults, so older files keep loading
/// after new settings are added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Capture device; `None` picks the platform default.
    pub camera_device: Option<String>,
    pub ticks_per_second: u32,
    pub hand_confidence: f32,
    pub max_hands: usize,
    pub scale_factor: f64,
    pub min_neighbors: usize,
    pub min_face_size: u32,
    pub geolocation_url: String,
    pub geolocation_timeout_secs: u64,
    /// Extra directory searched for model files before downloading.
    pub models_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            camera_device: None,
            ticks_per_second: TICKS_PER_SECOND,
            hand_confidence: HAND_CONFIDENCE,
            max_hands: MAX_HANDS,
            scale_factor: CASCADE_SCALE_FACTOR,
            min_neighbors: CASCADE_MIN_NEIGHBORS,
            min_face_size: CASCADE_MIN_FACE_SIZE,
            geolocation_url: GEOLOCATION_URL.to_string(),
            geolocation_timeout_secs: 5,
            models_dir: None,
        }
    }
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("settings.json"))
    }

    /// Loads from the platform config directory, or defaults.
    pub fn load() -> Self {
        Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
                log::warn!("Ignoring malformed settings at {}: {e}", path.display());
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }
}
