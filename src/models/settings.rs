use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub metadata_api_base: String,
    pub metadata_timeout_secs: u64,
    pub patch_buffer: usize, // Broadcast capacity for DOM patches
    pub diagnostics_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 17310,
            metadata_api_base: "https://api.streamelements.com/kappa/v2".to_string(),
            metadata_timeout_secs: 10,
            patch_buffer: 1000,
            diagnostics_enabled: true,
        }
    }
}

impl Settings {
    pub fn path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join("chat-overlay").join("settings.json"))
    }

    /// Load settings from disk, falling back to defaults when the file is absent
    pub fn load() -> Result<Settings> {
        let path = Self::path()?;
        if !path.exists() {
            return Ok(Settings::default());
        }

        let json = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<Settings> {
        serde_json::from_str(json).context("Failed to parse settings.json")
    }
}
