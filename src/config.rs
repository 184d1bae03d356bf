//! Configuration file support for the canvas core.
//!
//! Settings are stored as versioned JSON in the platform config directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::zoom;
use crate::input::Key;
use crate::keybindings::KeyBindings;
use crate::render::{LabelPalette, RenderSettings};
use crate::transform::ZoomLimits;

/// Log level setting for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Zoom behavior of the two canvases.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomConfig {
    /// Drawing canvas limits and wheel factors
    pub drawing: ZoomLimits,
    /// Lowest zoom of the final-mask canvas (unbounded above)
    pub final_min: f32,
    /// Margin factor around a contour when zooming to it
    pub fit_margin: f32,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            drawing: ZoomLimits::default(),
            final_min: zoom::FINAL_MIN,
            fit_margin: zoom::FIT_MARGIN,
        }
    }
}

impl ZoomConfig {
    /// Reject limits that leave the two canvases without a shared zoom level.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = |name: &str, value: f32| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(ConfigError::Invalid(format!(
                    "{name} must be a positive number, got {value}"
                )))
            }
        };
        let drawing = &self.drawing;
        positive("zoom.drawing.min", drawing.min)?;
        positive("zoom.drawing.max", drawing.max)?;
        positive("zoom.drawing.in_factor", drawing.in_factor)?;
        positive("zoom.drawing.out_factor", drawing.out_factor)?;
        positive("zoom.final_min", self.final_min)?;
        positive("zoom.fit_margin", self.fit_margin)?;

        if drawing.min > drawing.max {
            return Err(ConfigError::Invalid(format!(
                "zoom limits [{}, {}] are not a valid range",
                drawing.min, drawing.max
            )));
        }
        if self.final_min > drawing.max {
            return Err(ConfigError::Invalid(format!(
                "zoom.final_min {} exceeds the drawing canvas maximum {}",
                self.final_min, drawing.max
            )));
        }
        Ok(())
    }
}

/// Canvas configuration that can be exported and imported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasConfig {
    /// Version of the configuration file format
    pub version: u32,

    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,

    #[serde(default)]
    pub zoom: ZoomConfig,

    #[serde(default)]
    pub render: RenderSettings,

    /// Key that turns pointer drags into pans and enables wheel zoom
    #[serde(default = "default_modifier")]
    pub modifier: Key,

    #[serde(default)]
    pub keybindings: KeyBindings,

    /// Fixed colors per label name
    #[serde(default)]
    pub palette: LabelPalette,
}

fn default_modifier() -> Key {
    Key::Control
}

impl CanvasConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            log_level: LogLevel::default(),
            zoom: ZoomConfig::default(),
            render: RenderSettings::default(),
            modifier: default_modifier(),
            keybindings: KeyBindings::default(),
            palette: LabelPalette::default(),
        }
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        config.zoom.validate()?;
        Ok(config)
    }

    /// Get the default filename for config export.
    pub fn default_filename() -> &'static str {
        "maskcanvas-config.json"
    }

    /// Get the default config file path for auto-load/save.
    pub fn default_path() -> Option<PathBuf> {
        if let Some(config_dir) = dirs::config_dir() {
            Some(config_dir.join("maskcanvas").join(Self::default_filename()))
        } else {
            dirs::home_dir().map(|home_dir| {
                home_dir
                    .join(".config")
                    .join("maskcanvas")
                    .join(Self::default_filename())
            })
        }
    }

    /// Read and parse a configuration file.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Try to load configuration from the default path.
    /// Returns None if the file doesn't exist or can't be read.
    pub fn load_from_default_path() -> Option<Self> {
        let path = Self::default_path()?;
        if !path.exists() {
            log::debug!("No config file found at {:?}", path);
            return None;
        }

        match Self::load_from_path(&path) {
            Ok(config) => Some(config),
            Err(e) => {
                log::warn!("Failed to load config file {:?}: {}", path, e);
                None
            }
        }
    }

    /// Save configuration to the given path, creating parent directories.
    pub fn save_to_path(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = self.to_json()?;
        std::fs::write(path, json)?;
        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    /// Values parse but cannot be used
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// I/O error when reading/writing config
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
