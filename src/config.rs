//! Project configuration (img2tmx.yaml).
//!
//! The config file supplies defaults for conversion settings. Command-line
//! flags take precedence over anything set here.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TmxError};

/// Default config file name, looked up in the current directory.
pub const CONFIG_FILE: &str = "img2tmx.yaml";

/// Project configuration loaded from img2tmx.yaml.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tile width in pixels.
    pub tile_width: Option<u32>,

    /// Tile height in pixels (defaults to the tile width).
    pub tile_height: Option<u32>,

    /// Layer data format: base64, gzip, zlib or csv.
    pub format: Option<String>,

    /// Output directory for maps and tilesets.
    pub output: Option<PathBuf>,

    /// Round the atlas side up to a power of two.
    pub power_of_two: Option<bool>,

    /// Fail a map when a cell is missing from the tileset.
    pub strict: Option<bool>,

    /// Share one tileset between all converted maps.
    pub common_tileset: Option<bool>,

    /// Patterns to skip when scanning input directories.
    pub excludes: Vec<String>,
}

impl Config {
    /// Load config from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| TmxError::Io {
            path: path.to_path_buf(),
            message: format!("Failed to read config: {}", e),
        })?;

        Self::parse(&content)
    }

    /// Load an explicit config file, or `img2tmx.yaml` from `dir` if present.
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let default = dir.join(CONFIG_FILE);
        if default.is_file() {
            Self::load(&default)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse config from YAML string.
    pub fn parse(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| TmxError::Config {
            message: format!("Invalid config: {}", e),
            help: Some(format!("Check {} syntax", CONFIG_FILE)),
        })
    }

    /// Check if a path should be excluded based on exclude patterns.
    pub fn is_excluded(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy().replace('\\', "/");
        self.excludes
            .iter()
            .any(|pattern| matches_pattern(&path_str, pattern))
    }
}

/// Simple glob pattern matching.
fn matches_pattern(path: &str, pattern: &str) -> bool {
    if let Some(suffix) = pattern.strip_prefix("**/") {
        // **/dir/* matches anything inside dir anywhere in the path
        if let Some(dir) = suffix.strip_suffix("/*") {
            return path.starts_with(&format!("{}/", dir)) || path.contains(&format!("/{}/", dir));
        }
        return path.contains(suffix);
    }

    if let Some(suffix) = pattern.strip_prefix('*') {
        if !pattern.contains('/') {
            return path.ends_with(suffix);
        }
    }

    if let Some(prefix) = pattern.strip_suffix("/*") {
        return path.starts_with(&format!("{}/", prefix)) || path.contains(&format!("/{}/", prefix));
    }

    path.contains(pattern)
}
