//! User preferences persisted between sessions.

use crate::error::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Settings stored as JSON in the user's config directory
/// (e.g. `~/.config/tuus-imago/settings.json` on Linux).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Named CDN transformation placed ahead of the AI effects. Empty means
    /// the value from the environment is used.
    #[serde(default)]
    pub ai_template: String,
    /// Show the side panel with URLs and crop numbers.
    #[serde(default)]
    pub show_debug_panel: bool,
}

impl Settings {
    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "tuus-imago").map(|dirs| {
            let config_dir = dirs.config_dir();
            if !config_dir.exists() {
                let _ = fs::create_dir_all(config_dir);
            }
            config_dir.join("settings.json")
        })
    }

    /// Loads settings from disk, falling back to defaults if not found.
    pub fn load() -> Self {
        Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    fn load_from(path: &Path) -> Self {
        fs::read_to_string(path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default()
    }

    /// Persists settings to disk.
    ///
    /// # Errors
    /// Returns an error if serialization or file writing fails.
    pub fn save(&self) -> Result<()> {
        match Self::config_path() {
            Some(path) => self.save_to(&path),
            None => Ok(()),
        }
    }

    fn save_to(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// The preset to use: the saved one, else `fallback` from the environment.
    pub fn effective_ai_template(&self, fallback: Option<&str>) -> Option<String> {
        let saved = self.ai_template.trim();
        if saved.is_empty() {
            fallback.map(str::to_string)
        } else {
            Some(saved.to_string())
        }
    }
}
