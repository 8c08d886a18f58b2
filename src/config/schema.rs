//! Configuration schema types for `sheet.toml`
//!
//! Defines the structure, defaults, and validation rules for an export
//! project configuration. Defaults mirror the classic exporter dialog:
//! a 4x4 grid, PNG at 32 bits, auto-save at 2048 and 1024.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::layout::ACCEPTED_SHEET_SIZES;
use crate::manifest::{BitDepth, FileFormat};

/// Top-level `sheet.toml` structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetConfig {
    /// Project metadata
    pub project: ProjectConfig,
    /// Sheet layout and save options
    #[serde(default)]
    pub sheet: SheetSection,
}

/// Project metadata section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name (required); namespaces the staging directories
    pub name: String,
    /// Project root the `FrameExports` tree lives under
    #[serde(default = "default_root")]
    pub root: PathBuf,
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

/// Sheet layout and file save options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetSection {
    /// Output sheet name; defaults to `T_<project name>`
    #[serde(default)]
    pub name: Option<String>,
    /// Columns in the sheet grid
    #[serde(default = "default_grid_dim")]
    pub columns: u32,
    /// Rows in the sheet grid
    #[serde(default = "default_grid_dim")]
    pub rows: u32,
    /// Width of a single frame in pixels
    #[serde(default = "default_frame_dim")]
    pub frame_width: u32,
    /// Height of a single frame in pixels
    #[serde(default = "default_frame_dim")]
    pub frame_height: u32,
    /// Whether to auto-save resized sheets downstream
    #[serde(default = "default_auto_save")]
    pub auto_save: bool,
    /// Sheet sizes to auto-save
    #[serde(default = "default_sizes")]
    pub sizes: Vec<u32>,
    /// Output image format
    #[serde(default = "default_format")]
    pub format: FileFormat,
    /// Output bit depth (24-bit is TGA-only)
    #[serde(default = "default_bit_depth")]
    pub bit_depth: BitDepth,
}

impl Default for SheetSection {
    fn default() -> Self {
        Self {
            name: None,
            columns: default_grid_dim(),
            rows: default_grid_dim(),
            frame_width: default_frame_dim(),
            frame_height: default_frame_dim(),
            auto_save: default_auto_save(),
            sizes: default_sizes(),
            format: default_format(),
            bit_depth: default_bit_depth(),
        }
    }
}

fn default_grid_dim() -> u32 {
    4
}

fn default_frame_dim() -> u32 {
    512
}

fn default_auto_save() -> bool {
    true
}

fn default_sizes() -> Vec<u32> {
    vec![2048, 1024]
}

fn default_format() -> FileFormat {
    FileFormat::Png
}

fn default_bit_depth() -> BitDepth {
    BitDepth::ThirtyTwo
}

impl SheetConfig {
    /// The effective output sheet name: the configured one, or
    /// `T_<project name>` when none was given.
    pub fn sheet_name(&self) -> String {
        match &self.sheet.name {
            Some(name) => name.clone(),
            None => format!("T_{}", self.project.name),
        }
    }

    /// Coerce inconsistent settings the way the classic dialog did:
    /// selecting PNG forces 32-bit output.
    pub fn normalize(&mut self) {
        if self.sheet.format == FileFormat::Png {
            self.sheet.bit_depth = BitDepth::ThirtyTwo;
        }
    }

    /// Validate the configuration, returning one message per problem.
    ///
    /// An empty result means the config is usable. Layout geometry versus
    /// frame count is deliberately not checked here; that is the
    /// validator's job once the frame count is known.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.project.name.trim().is_empty() {
            errors.push("project.name must not be empty".to_string());
        }
        if self.sheet_name().trim().is_empty() {
            errors.push("sheet.name must not be empty".to_string());
        }
        if self.sheet.columns == 0 {
            errors.push("sheet.columns must be at least 1".to_string());
        }
        if self.sheet.rows == 0 {
            errors.push("sheet.rows must be at least 1".to_string());
        }
        if self.sheet.frame_width == 0 || self.sheet.frame_height == 0 {
            errors.push(format!(
                "frame dimensions must be positive, got {}x{}",
                self.sheet.frame_width, self.sheet.frame_height
            ));
        }
        for &size in &self.sheet.sizes {
            if !ACCEPTED_SHEET_SIZES.contains(&size) {
                errors.push(format!(
                    "sheet.sizes entry {} is not an accepted size {:?}",
                    size, ACCEPTED_SHEET_SIZES
                ));
            }
        }
        if self.sheet.format == FileFormat::Png && self.sheet.bit_depth != BitDepth::ThirtyTwo {
            errors.push("PNG output requires bit_depth = 32".to_string());
        }

        errors
    }
}
