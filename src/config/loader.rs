//! Configuration loading and discovery for `sheet.toml`
//!
//! Provides functions to find, load, and merge configuration.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::manifest::{BitDepth, FileFormat};

use super::schema::{ProjectConfig, SheetConfig};

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("failed to parse sheet.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error
    #[error("config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}

/// CLI arguments that can override config values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    /// Override project root
    pub root: Option<PathBuf>,
    /// Override sheet name
    pub sheet_name: Option<String>,
    /// Override column count
    pub columns: Option<u32>,
    /// Override row count
    pub rows: Option<u32>,
    /// Override frame width
    pub frame_width: Option<u32>,
    /// Override frame height
    pub frame_height: Option<u32>,
    /// Override auto-save flag
    pub auto_save: Option<bool>,
    /// Override auto-save sizes
    pub sizes: Option<Vec<u32>>,
    /// Override file format
    pub format: Option<FileFormat>,
    /// Override bit depth
    pub bit_depth: Option<BitDepth>,
}

/// Find sheet.toml by walking up from the current working directory.
pub fn find_config() -> Option<PathBuf> {
    env::current_dir().ok().and_then(find_config_from)
}

/// Find sheet.toml by walking up from a specific directory.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;

    loop {
        let config_path = current.join("sheet.toml");
        if config_path.exists() {
            return Some(config_path);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Load configuration from a sheet.toml file.
///
/// If a path is provided, loads from that file. Otherwise uses
/// [`find_config`] to locate one; when none is found, falls back to
/// [`default_config`]. Loaded configs are normalized and validated.
pub fn load_config(path: Option<&Path>) -> Result<SheetConfig, ConfigError> {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config(),
    };

    match config_path {
        Some(p) => load_config_file(&p),
        None => Ok(default_config()),
    }
}

fn load_config_file(path: &Path) -> Result<SheetConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let mut config: SheetConfig = toml::from_str(&contents)?;
    finalize(&mut config)?;
    Ok(config)
}

/// Create a default configuration when no sheet.toml is found.
///
/// The project name falls back to the current directory name.
pub fn default_config() -> SheetConfig {
    let project_name = env::current_dir()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "unnamed".to_string());

    SheetConfig {
        project: ProjectConfig {
            name: project_name,
            root: PathBuf::from("."),
        },
        sheet: Default::default(),
    }
}

/// Merge CLI overrides into a configuration.
///
/// CLI arguments take precedence over config file values. Call
/// [`finalize`] afterwards: overrides can reintroduce inconsistencies
/// (e.g. switching to PNG while 24-bit is configured).
pub fn merge_cli_overrides(config: &mut SheetConfig, overrides: &CliOverrides) {
    if let Some(root) = &overrides.root {
        config.project.root = root.clone();
    }
    if let Some(name) = &overrides.sheet_name {
        config.sheet.name = Some(name.clone());
    }
    if let Some(columns) = overrides.columns {
        config.sheet.columns = columns;
    }
    if let Some(rows) = overrides.rows {
        config.sheet.rows = rows;
    }
    if let Some(width) = overrides.frame_width {
        config.sheet.frame_width = width;
    }
    if let Some(height) = overrides.frame_height {
        config.sheet.frame_height = height;
    }
    if let Some(auto_save) = overrides.auto_save {
        config.sheet.auto_save = auto_save;
    }
    if let Some(sizes) = &overrides.sizes {
        config.sheet.sizes = sizes.clone();
    }
    if let Some(format) = overrides.format {
        config.sheet.format = format;
    }
    if let Some(bit_depth) = overrides.bit_depth {
        config.sheet.bit_depth = bit_depth;
    }
}

/// Normalize and validate a configuration, turning validation messages
/// into a [`ConfigError::Validation`].
pub fn finalize(config: &mut SheetConfig) -> Result<(), ConfigError> {
    config.normalize();
    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors));
    }
    Ok(())
}
