//! Shared settings for the TrapScale CLI and GUI.
//! Persisted in the platform-specific config directory via `directories::ProjectDirs`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::scale::Unit;

/// Application settings that can be saved and loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Project/image API base URL
    pub api_base_url: String,
    /// Bearer token for the API session (empty for anonymous access)
    pub auth_token: String,
    /// Project identifier to open on launch
    pub project_id: String,
    /// Default unit code ("mm", "cm", "m", "inch", "ft")
    pub default_unit: String,
    /// Maximum display width for the calibration canvas
    pub max_display_width: f64,
    /// Maximum display height for the calibration canvas
    pub max_display_height: f64,
    /// Path to a TTF/OTF font used for point labels (optional)
    pub label_font_path: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:5000".to_string(),
            auth_token: String::new(),
            project_id: String::new(),
            default_unit: Unit::Centimeter.as_code().to_string(),
            max_display_width: 800.0,
            max_display_height: 500.0,
            label_font_path: String::new(),
        }
    }
}

impl AppSettings {
    /// Get the config directory path.
    pub fn config_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("org", "trapscale", "trapscale")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the settings file path.
    pub fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("settings.json"))
    }

    /// Load settings from the config file.
    pub fn load() -> Self {
        Self::settings_path()
            .and_then(|path| fs::read_to_string(&path).ok())
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default()
    }

    /// Save settings to the config file.
    pub fn save(&self) -> Result<(), String> {
        let dir = Self::config_dir().ok_or("Cannot determine config directory")?;

        // Create config directory if it doesn't exist
        fs::create_dir_all(&dir)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;

        let path = dir.join("settings.json");
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize settings: {}", e))?;

        fs::write(&path, content).map_err(|e| format!("Failed to write settings file: {}", e))?;

        Ok(())
    }

    /// Get logs directory path.
    pub fn logs_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("org", "trapscale", "trapscale")
            .map(|dirs| dirs.data_dir().join("logs"))
    }

    /// Parsed default unit.
    pub fn default_unit(&self) -> Unit {
        Unit::from_code(&self.default_unit)
    }
}
