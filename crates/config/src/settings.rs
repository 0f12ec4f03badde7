// Application settings
// Loaded from ~/.config/parqview/settings.json

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use parqview_engine::layout::WidthLimits;
use parqview_engine::{DisplayOptions, SessionOptions};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::recent::RecentFiles;
use crate::theme::Theme;

/// Last window placement, restored on startup
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowGeometry {
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub width: u32,
    pub height: u32,
    pub maximized: bool,
}

impl Default for WindowGeometry {
    fn default() -> Self {
        Self {
            x: None,
            y: None,
            width: 1100,
            height: 700,
            maximized: false,
        }
    }
}

/// Editing and display preferences fed into each session
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditingSettings {
    /// Undo depth; 0 keeps every edit
    pub history_limit: usize,
    pub float_decimals: usize,
    pub thousands_separator: char,
    pub min_column_width: usize,
    pub max_column_width: usize,
}

impl Default for EditingSettings {
    fn default() -> Self {
        let session = SessionOptions::default();
        Self {
            history_limit: session.history_limit,
            float_decimals: session.display.float_decimals,
            thousands_separator: session.display.thousands_separator,
            min_column_width: session.widths.min,
            max_column_width: session.widths.max,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub theme: Theme,
    /// Directory of the last open/save dialog
    pub last_directory: Option<PathBuf>,
    pub recent_files: RecentFiles,
    pub window: WindowGeometry,
    pub editing: EditingSettings,
}

impl Settings {
    /// Get the config file path
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("parqview");
        config_dir.join("settings.json")
    }

    /// Load settings from disk, falling back to defaults
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// A missing or unreadable file yields defaults; settings never block startup.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            debug!("no settings at {}, using defaults", path.display());
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => {
                // Strip comments (lines starting with //)
                let cleaned: String = contents
                    .lines()
                    .filter(|line| !line.trim().starts_with("//"))
                    .collect::<Vec<_>>()
                    .join("\n");

                match serde_json::from_str::<Settings>(&cleaned) {
                    Ok(mut settings) => {
                        settings.normalize();
                        settings
                    }
                    Err(e) => {
                        warn!("error parsing {}: {}; using defaults", path.display(), e);
                        Self::default()
                    }
                }
            }
            Err(e) => {
                warn!("error reading {}: {}; using defaults", path.display(), e);
                Self::default()
            }
        }
    }

    /// Save settings to disk
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |e: std::io::Error| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        };

        // Ensure directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| ConfigError::Encode(e.to_string()))?;
        fs::write(path, json).map_err(io_err)
    }

    /// Record an opened or saved file; also remembers its directory
    pub fn add_recent_file(&mut self, path: &Path) {
        self.recent_files.push(path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            self.last_directory = Some(parent.to_path_buf());
        }
    }

    pub fn to_session_options(&self) -> SessionOptions {
        let e = &self.editing;
        SessionOptions {
            display: DisplayOptions {
                float_decimals: e.float_decimals,
                thousands_separator: e.thousands_separator,
            },
            history_limit: e.history_limit,
            widths: WidthLimits {
                min: e.min_column_width,
                max: e.max_column_width,
            },
        }
    }

    // Hand-edited values are clamped rather than rejected
    fn normalize(&mut self) {
        self.recent_files.normalize();
        let e = &mut self.editing;
        e.float_decimals = e.float_decimals.min(12);
        e.min_column_width = e.min_column_width.max(1);
        if e.max_column_width < e.min_column_width {
            e.max_column_width = e.min_column_width;
        }
    }
}
