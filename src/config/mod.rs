//! Application Configuration
//!
//! Database location, build parameters, matching and capture settings,
//! stored in TOML format. Values are handed explicitly to the engine; no
//! module reads configuration on its own.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::vision::preprocess::TextPolarity;

/// File name of the fingerprint database inside the data directory
pub const DATABASE_FILE_NAME: &str = "font_features.json";

/// Characters rendered for every font when building fingerprints
pub const DEFAULT_CHARSET: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Fingerprint database location
    pub database: DatabaseSettings,
    /// Offline database build settings
    pub build: BuildSettings,
    /// Matching settings
    pub matching: MatchingSettings,
    /// Capture preprocessing and OCR filtering
    pub capture: CaptureSettings,
}

/// Fingerprint database location
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Artifact path; the platform data directory is used when unset
    pub path: Option<PathBuf>,
}

/// Offline database build settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSettings {
    /// Characters sampled per font
    pub charset: String,
    /// Side length of the square canvas glyphs are centered on
    pub canvas_size: u32,
    /// Rendering size in pixels per em
    pub point_size: f32,
    /// Directories scanned for font files; empty means platform defaults
    pub font_dirs: Vec<PathBuf>,
    /// Worker threads (0 = available parallelism)
    pub workers: usize,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            charset: DEFAULT_CHARSET.to_string(),
            canvas_size: 64,
            point_size: 48.0,
            font_dirs: Vec::new(),
            workers: 0,
        }
    }
}

/// Matching settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingSettings {
    /// Number of ranked fonts to report
    pub top_n: usize,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self { top_n: 3 }
    }
}

/// Capture preprocessing and OCR filtering
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Minimum OCR confidence for a text region to be used (0.0 - 1.0)
    pub min_confidence: f32,
    /// Integer upscale applied before thresholding
    pub upscale_factor: u32,
    /// Gaussian sigma of the local mean used for thresholding
    pub threshold_sigma: f32,
    /// How far below (or above) the local mean a pixel must be to count as text
    pub threshold_offset: u8,
    /// Text/background contrast direction
    pub polarity: TextPolarity,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            min_confidence: 0.4,
            upscale_factor: 2,
            threshold_sigma: 2.0,
            threshold_offset: 5,
            polarity: TextPolarity::DarkOnLight,
        }
    }
}

impl AppConfig {
    /// Check value ranges the engine relies on
    pub fn validate(&self) -> Result<()> {
        let build = &self.build;
        if build.charset.chars().all(char::is_whitespace) {
            return Err(Error::Config("build.charset must not be empty".into()));
        }
        if build.canvas_size == 0 {
            return Err(Error::Config("build.canvas_size must be at least 1".into()));
        }
        if !build.point_size.is_finite() || build.point_size <= 0.0 {
            return Err(Error::Config("build.point_size must be a positive number".into()));
        }
        if self.matching.top_n == 0 {
            return Err(Error::Config("matching.top_n must be at least 1".into()));
        }
        if self.capture.upscale_factor == 0 {
            return Err(Error::Config("capture.upscale_factor must be at least 1".into()));
        }
        if !self.capture.threshold_sigma.is_finite() || self.capture.threshold_sigma <= 0.0 {
            return Err(Error::Config("capture.threshold_sigma must be a positive number".into()));
        }
        Ok(())
    }

    /// Database artifact path, falling back to the platform data directory
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.database.path {
            Some(path) => Ok(path.clone()),
            None => Ok(crate::storage::get_data_dir()?.join(DATABASE_FILE_NAME)),
        }
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
    config.validate()?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config).map_err(|e| Error::Config(e.to_string()))?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}

/// Load configuration, writing the defaults first if the file does not exist.
///
/// An unreadable or invalid file is reported and replaced by defaults for
/// this run; the file itself is left untouched.
pub fn load_or_create_config(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        info!("Config file not found, creating default config at {:?}", path);
        let config = AppConfig::default();
        save_config(&config, path)?;
        return Ok(config);
    }

    match load_config(path) {
        Ok(config) => {
            info!("Loaded configuration from {:?}", path);
            Ok(config)
        }
        Err(e) => {
            warn!("Could not load configuration from {:?}: {}. Using defaults.", path, e);
            Ok(AppConfig::default())
        }
    }
}
