//! Pipeline configuration module.
//!
//! Handles loading and validating `thumbs.toml`. Every constant the
//! pipeline depends on — directory layout, the display box measured from
//! the website's model card, encoding quality, worker count, and remote
//! endpoints — lives here and is passed into components explicitly. No
//! module-level path or geometry constants exist anywhere else.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [paths]
//! models_dir = "data/models"     # One JSON file per model record
//! cache_dir = ".thumb-cache"     # Persisted cache (downloads + thumbnails)
//! output_dir = "public/thumbs"   # Published thumbnail output
//!
//! [display]
//! # Measured from the model card on the website. The card is rendered
//! # between these two sizes depending on viewport.
//! min_width = 266
//! min_height = 154
//! max_width = 549
//! max_height = 222
//! # Devices with higher DPI get a proportionally larger paired crop.
//! dpi_scale = 1.33
//! # Longer side of a small gallery thumbnail.
//! small_target = 72
//!
//! [quality]
//! jpeg = 90          # Main thumbnails
//! small_jpeg = 60    # Small gallery thumbnails
//!
//! [processing]
//! workers = 16       # Fixed worker pool size
//!
//! # Remote collaborators. Each endpoint is optional; when omitted the
//! # corresponding cache tier or metadata source is simply skipped.
//! [remote]
//! # thumbs_base_url = "https://example.org/thumbs"
//! # size_metadata_url = "https://example.org/thumbs/_image-metadata.json"
//! # cache_archive_url = "https://example.org/releases/thumbs.zip"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Name of the size-metadata file, identical in the output directory,
/// the persisted cache, and the published remote cache.
pub const SIZE_METADATA_FILENAME: &str = "_image-metadata.json";

/// Pipeline configuration loaded from `thumbs.toml`.
///
/// All fields have defaults matching the published site; user config
/// files need only specify overrides.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub paths: PathsConfig,
    pub display: DisplayConfig,
    pub quality: QualityConfig,
    pub processing: ProcessingConfig,
    pub remote: RemoteConfig,
}

/// Directory layout. Derived paths (image download dir, persisted
/// thumbnail dir, size-metadata files) hang off these three roots.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    pub models_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            models_dir: PathBuf::from("data/models"),
            cache_dir: PathBuf::from(".thumb-cache"),
            output_dir: PathBuf::from("public/thumbs"),
        }
    }
}

impl PathsConfig {
    /// Where downloaded source images are kept between runs.
    pub fn images_dir(&self) -> PathBuf {
        self.cache_dir.join("images")
    }

    /// Persisted copy of previously generated thumbnails.
    pub fn cache_thumbs_dir(&self) -> PathBuf {
        self.cache_dir.join("thumbs")
    }

    /// Size-metadata file written alongside the published thumbnails.
    pub fn output_metadata_path(&self) -> PathBuf {
        self.output_dir.join(SIZE_METADATA_FILENAME)
    }

    /// Size-metadata file inside the persisted cache.
    pub fn cache_metadata_path(&self) -> PathBuf {
        self.cache_thumbs_dir().join(SIZE_METADATA_FILENAME)
    }
}

/// Display-box constants measured from the website's model card.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DisplayConfig {
    pub min_width: u32,
    pub min_height: u32,
    pub max_width: u32,
    pub max_height: u32,
    /// DPI scale factor applied to the paired crop box.
    pub dpi_scale: f64,
    /// Longer-side target for small gallery thumbnails.
    pub small_target: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            min_width: 266,
            min_height: 154,
            max_width: 549,
            max_height: 222,
            dpi_scale: 1.33,
            small_target: 72,
        }
    }
}

/// Lossy encoding quality settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QualityConfig {
    pub jpeg: u8,
    pub small_jpeg: u8,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            jpeg: 90,
            small_jpeg: 60,
        }
    }
}

/// Worker pool settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Fixed number of concurrent record workers.
    pub workers: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self { workers: 16 }
    }
}

/// Published remote collaborators. Every endpoint is optional: a missing
/// endpoint disables that tier or source instead of failing.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct RemoteConfig {
    /// Base URL thumbnails are published under; tier 3 of the cache.
    pub thumbs_base_url: Option<String>,
    /// Published size-metadata JSON; lowest-precedence size source.
    pub size_metadata_url: Option<String>,
    /// Archived cache snapshot restored at process start.
    pub cache_archive_url: Option<String>,
}

impl PipelineConfig {
    /// Load from a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Disable all remote endpoints (the `--offline` flag).
    pub fn disable_remote(&mut self) {
        self.remote = RemoteConfig::default();
    }
}

/// Stock `thumbs.toml` with all options documented.
pub fn stock_config_toml() -> &'static str {
    r##"# Model Thumbs Configuration
# ==========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Directory layout
# ---------------------------------------------------------------------------
[paths]
# One JSON file per model record; the filename stem is the record id.
models_dir = "data/models"
# Persisted cache: downloaded source images and previously built thumbnails.
cache_dir = ".thumb-cache"
# Published thumbnail output. Referenced on the site as /thumbs/<name>.
output_dir = "public/thumbs"

# ---------------------------------------------------------------------------
# Display geometry
# ---------------------------------------------------------------------------
[display]
# Measured from the model card on the website: the card renders between
# these two sizes depending on viewport.
min_width = 266
min_height = 154
max_width = 549
max_height = 222
# DPI scale factor: devices with higher DPI get a larger paired crop.
dpi_scale = 1.33
# Longer-side target for small gallery thumbnails.
small_target = 72

# ---------------------------------------------------------------------------
# Encoding quality
# ---------------------------------------------------------------------------
[quality]
jpeg = 90        # Main thumbnails
small_jpeg = 60  # Small gallery thumbnails

# ---------------------------------------------------------------------------
# Parallel processing
# ---------------------------------------------------------------------------
[processing]
workers = 16     # Fixed worker pool size

# ---------------------------------------------------------------------------
# Remote collaborators. Each endpoint is optional; omitting one disables
# that cache tier or metadata source.
# ---------------------------------------------------------------------------
[remote]
# thumbs_base_url = "https://example.org/thumbs"
# size_metadata_url = "https://example.org/thumbs/_image-metadata.json"
# cache_archive_url = "https://example.org/releases/thumbs.zip"
"##
}
