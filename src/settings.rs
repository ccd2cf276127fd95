//! Persisted application settings
//!
//! Auto-cut thresholds and playback toggles survive restarts; cut points do
//! not (they live in the in-memory session cache only).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_threshold() -> f32 {
    0.01
}

/// Application-wide settings
///
/// Persisted to ~/Library/Application Support/Cutpoint/app_settings.json
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// Normalized amplitude threshold for cut-in detection
    #[serde(default = "default_threshold")]
    pub threshold_in: f32,
    /// Normalized amplitude threshold for cut-out detection
    #[serde(default = "default_threshold")]
    pub threshold_out: f32,
    /// Whether playback starts automatically when a file is loaded
    #[serde(default)]
    pub autoplay: bool,
    /// Whether playback loops back to cut-in at the cut-out
    #[serde(default)]
    pub repeat: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            threshold_in: default_threshold(),
            threshold_out: default_threshold(),
            autoplay: false,
            repeat: false,
        }
    }
}

impl AppSettings {
    const SETTINGS_FILE: &'static str = "app_settings.json";

    /// Get the app data directory (~/Library/Application Support/Cutpoint/)
    fn get_app_data_dir() -> Result<PathBuf, String> {
        let data_dir =
            dirs::data_dir().ok_or_else(|| "Could not determine data directory".to_string())?;

        let app_dir = data_dir.join("Cutpoint");

        // Create directory if it doesn't exist
        if !app_dir.exists() {
            std::fs::create_dir_all(&app_dir)
                .map_err(|e| format!("Failed to create app directory: {}", e))?;
        }

        Ok(app_dir)
    }

    /// Load app settings from disk, or return defaults if not found
    pub fn load() -> Self {
        match Self::try_load() {
            Ok(settings) => {
                log::debug!("Loaded app settings from disk");
                settings
            }
            Err(e) => {
                log::debug!("Using default app settings: {}", e);
                Self::default()
            }
        }
    }

    fn try_load() -> Result<Self, String> {
        let app_dir = Self::get_app_data_dir()?;
        let settings_path = app_dir.join(Self::SETTINGS_FILE);

        if !settings_path.exists() {
            return Err("Settings file not found".to_string());
        }

        let contents = std::fs::read_to_string(&settings_path)
            .map_err(|e| format!("Failed to read settings: {}", e))?;

        serde_json::from_str(&contents).map_err(|e| format!("Failed to parse settings: {}", e))
    }

    /// Save app settings to disk
    pub fn save(&self) -> Result<(), String> {
        let app_dir = Self::get_app_data_dir()?;
        let settings_path = app_dir.join(Self::SETTINGS_FILE);

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize settings: {}", e))?;

        std::fs::write(&settings_path, json)
            .map_err(|e| format!("Failed to write settings: {}", e))?;

        log::debug!("Saved app settings to {:?}", settings_path);
        Ok(())
    }
}
