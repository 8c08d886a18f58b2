//! Export manifest - the durable handoff artifact between render and assembly
//!
//! The manifest is a fixed-order, line-oriented text file: ten header fields
//! followed by exactly `columns * rows` absolute frame paths in render order.
//! The downstream assembler reads it exactly once; it is never mutated after
//! being written.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::layout::ACCEPTED_SHEET_SIZES;

/// Image format of the rendered frames (and the assembled sheet)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Png,
    Tga,
}

impl FileFormat {
    /// Manifest literal ("PNG" / "TGA")
    pub fn as_str(&self) -> &'static str {
        match self {
            FileFormat::Png => "PNG",
            FileFormat::Tga => "TGA",
        }
    }

    /// File extension without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            FileFormat::Png => "png",
            FileFormat::Tga => "tga",
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PNG" => Ok(FileFormat::Png),
            "TGA" => Ok(FileFormat::Tga),
            other => Err(format!("unknown file format '{}', expected PNG or TGA", other)),
        }
    }
}

/// Bit depth of the exported sheet (24-bit is TGA-only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum BitDepth {
    TwentyFour,
    ThirtyTwo,
}

impl BitDepth {
    /// Manifest literal ("24" / "32")
    pub fn as_str(&self) -> &'static str {
        match self {
            BitDepth::TwentyFour => "24",
            BitDepth::ThirtyTwo => "32",
        }
    }
}

impl fmt::Display for BitDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<u8> for BitDepth {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            24 => Ok(BitDepth::TwentyFour),
            32 => Ok(BitDepth::ThirtyTwo),
            other => Err(format!("unsupported bit depth {}, expected 24 or 32", other)),
        }
    }
}

impl From<BitDepth> for u8 {
    fn from(depth: BitDepth) -> u8 {
        match depth {
            BitDepth::TwentyFour => 24,
            BitDepth::ThirtyTwo => 32,
        }
    }
}

/// Error building, writing, or parsing an export manifest
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ManifestError {
    /// File I/O failure, with the path that failed
    #[error("manifest I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Frame path count does not match the grid
    #[error("manifest must list {expected} frame paths (columns * rows), got {actual}")]
    FrameCountMismatch { expected: usize, actual: usize },
    /// PNG output is always exported at 32 bits
    #[error("PNG output requires 32-bit depth")]
    PngBitDepth,
    /// Target size not in the accepted square sheet size list
    #[error("target sheet size {0} is not an accepted size (choose from 2048, 1024, 512, 256, 128, 64)")]
    SizeNotAccepted(u32),
    /// A line break inside a field would corrupt the line-oriented format
    #[error("{field} must not contain line breaks")]
    EmbeddedLineBreak { field: &'static str },
    /// Malformed manifest content at a given line (1-based)
    #[error("manifest parse error at line {line}: {message}")]
    Parse { line: usize, message: String },
}

/// Everything the downstream assembler needs to compose the sheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportManifest {
    /// Output sheet name chosen by the operator
    pub sheet_name: String,
    /// Project folder the staging directory lives under
    pub project_folder: PathBuf,
    /// Columns in the sheet grid
    pub columns: u32,
    /// Rows in the sheet grid
    pub rows: u32,
    /// Width of a single frame in pixels
    pub frame_width: u32,
    /// Height of a single frame in pixels
    pub frame_height: u32,
    /// Whether the assembler may resize and save the sheet automatically
    pub auto_save: bool,
    /// Sheet sizes to auto-save, descending and unique
    pub target_sheet_sizes: Vec<u32>,
    /// Output image format
    pub file_format: FileFormat,
    /// Output bit depth
    pub bit_depth: BitDepth,
    /// Absolute frame paths in row-major render order, one per grid cell
    pub frame_paths: Vec<PathBuf>,
}

impl ExportManifest {
    /// Build a manifest, enforcing its invariants.
    ///
    /// `target_sheet_sizes` is normalized to descending unique order and must
    /// be a subset of [`ACCEPTED_SHEET_SIZES`]. `frame_paths` must contain
    /// exactly `columns * rows` entries, and PNG output must be 32-bit.
    /// `sheet_name`, `project_folder`, and every frame path must be free of
    /// line breaks, since each occupies exactly one line of the manifest.
    pub fn new(
        sheet_name: String,
        project_folder: PathBuf,
        columns: u32,
        rows: u32,
        frame_width: u32,
        frame_height: u32,
        auto_save: bool,
        mut target_sheet_sizes: Vec<u32>,
        file_format: FileFormat,
        bit_depth: BitDepth,
        frame_paths: Vec<PathBuf>,
    ) -> Result<Self, ManifestError> {
        let expected = (columns as usize) * (rows as usize);
        if frame_paths.len() != expected {
            return Err(ManifestError::FrameCountMismatch {
                expected,
                actual: frame_paths.len(),
            });
        }
        if file_format == FileFormat::Png && bit_depth != BitDepth::ThirtyTwo {
            return Err(ManifestError::PngBitDepth);
        }
        if has_line_break(&sheet_name) {
            return Err(ManifestError::EmbeddedLineBreak { field: "sheet name" });
        }
        if has_line_break(&project_folder.to_string_lossy()) {
            return Err(ManifestError::EmbeddedLineBreak {
                field: "project folder",
            });
        }
        if frame_paths
            .iter()
            .any(|p| has_line_break(&p.to_string_lossy()))
        {
            return Err(ManifestError::EmbeddedLineBreak { field: "frame path" });
        }
        if let Some(&bad) = target_sheet_sizes
            .iter()
            .find(|s| !ACCEPTED_SHEET_SIZES.contains(s))
        {
            return Err(ManifestError::SizeNotAccepted(bad));
        }
        target_sheet_sizes.sort_unstable_by(|a, b| b.cmp(a));
        target_sheet_sizes.dedup();

        Ok(Self {
            sheet_name,
            project_folder,
            columns,
            rows,
            frame_width,
            frame_height,
            auto_save,
            target_sheet_sizes,
            file_format,
            bit_depth,
            frame_paths,
        })
    }

    /// Serialize to the line-oriented manifest format.
    pub fn to_manifest_string(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.sheet_name);
        out.push('\n');
        out.push_str(&self.project_folder.display().to_string());
        out.push('\n');
        out.push_str(&format!("{}\n", self.columns));
        out.push_str(&format!("{}\n", self.rows));
        out.push_str(&format!("{}\n", self.frame_width));
        out.push_str(&format!("{}\n", self.frame_height));
        out.push_str(if self.auto_save { "true\n" } else { "false\n" });
        out.push_str(&format!("{}\n", format_size_list(&self.target_sheet_sizes)));
        out.push_str(&format!("{}\n", self.file_format));
        out.push_str(&format!("{}\n", self.bit_depth));
        for path in &self.frame_paths {
            out.push_str(&path.display().to_string());
            out.push('\n');
        }
        out
    }

    /// Write the manifest to `destination`, replacing any prior file.
    ///
    /// The content is written to a temporary sibling file and renamed into
    /// place, so a consumer never observes a partially written manifest.
    pub fn write(&self, destination: &Path) -> Result<(), ManifestError> {
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| ManifestError::Io { path, source }
        };

        let file_name = destination
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "manifest".to_string());
        let tmp = destination.with_file_name(format!("{}.tmp", file_name));

        fs::write(&tmp, self.to_manifest_string()).map_err(io_err(&tmp))?;
        fs::rename(&tmp, destination).map_err(io_err(destination))?;
        Ok(())
    }

    /// Parse a manifest file written by [`ExportManifest::write`].
    ///
    /// This is the consumer side of the handoff; a written manifest must
    /// round-trip field-for-field, including list and path ordering.
    pub fn parse(path: &Path) -> Result<Self, ManifestError> {
        let content = fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_str(&content)
    }

    /// Parse manifest content (see [`ExportManifest::parse`]).
    pub fn parse_str(content: &str) -> Result<Self, ManifestError> {
        let lines: Vec<&str> = content.lines().collect();
        if lines.len() < 10 {
            return Err(ManifestError::Parse {
                line: lines.len() + 1,
                message: format!("expected 10 header lines, file has {}", lines.len()),
            });
        }

        let sheet_name = lines[0].to_string();
        let project_folder = PathBuf::from(lines[1]);
        let columns = parse_int(lines[2], 3, "columns")?;
        let rows = parse_int(lines[3], 4, "rows")?;
        let frame_width = parse_int(lines[4], 5, "frame width")?;
        let frame_height = parse_int(lines[5], 6, "frame height")?;
        let auto_save = match lines[6] {
            "true" => true,
            "false" => false,
            other => {
                return Err(ManifestError::Parse {
                    line: 7,
                    message: format!("expected 'true' or 'false' for auto-save, got '{}'", other),
                })
            }
        };
        let target_sheet_sizes = parse_size_list(lines[7], 8)?;
        let file_format = lines[8]
            .parse::<FileFormat>()
            .map_err(|message| ManifestError::Parse { line: 9, message })?;
        let bit_depth = match lines[9] {
            "24" => BitDepth::TwentyFour,
            "32" => BitDepth::ThirtyTwo,
            other => {
                return Err(ManifestError::Parse {
                    line: 10,
                    message: format!("expected '24' or '32' for bit depth, got '{}'", other),
                })
            }
        };

        let expected = (columns as usize) * (rows as usize);
        let frame_lines = &lines[10..];
        if frame_lines.len() != expected {
            return Err(ManifestError::Parse {
                line: 10 + frame_lines.len(),
                message: format!(
                    "expected {} frame path lines (columns * rows), found {}",
                    expected,
                    frame_lines.len()
                ),
            });
        }
        let frame_paths = frame_lines.iter().map(PathBuf::from).collect();

        Self::new(
            sheet_name,
            project_folder,
            columns,
            rows,
            frame_width,
            frame_height,
            auto_save,
            target_sheet_sizes,
            file_format,
            bit_depth,
            frame_paths,
        )
    }
}

/// Compute the frame paths the render front-end will produce.
///
/// Frames are numbered sequentially from 0, zero-padded to five digits in
/// the filename stem: `<staging_dir>/<stem>00000.<ext>`, `<stem>00001.<ext>`
/// and so on, in row-major render order.
pub fn expected_frame_paths(
    staging_dir: &Path,
    stem: &str,
    format: FileFormat,
    count: u32,
) -> Vec<PathBuf> {
    (0..count)
        .map(|i| staging_dir.join(format!("{}{:05}.{}", stem, i, format.extension())))
        .collect()
}

/// Serialize sizes as a bracketed comma list with no interior spaces,
/// e.g. `[2048,1024]` (empty list is `[]`).
fn format_size_list(sizes: &[u32]) -> String {
    let items: Vec<String> = sizes.iter().map(|s| s.to_string()).collect();
    format!("[{}]", items.join(","))
}

fn parse_size_list(s: &str, line: usize) -> Result<Vec<u32>, ManifestError> {
    let inner = s
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(|| ManifestError::Parse {
            line,
            message: format!("expected bracketed size list like [2048,1024], got '{}'", s),
        })?;
    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }
    inner
        .split(',')
        .map(|item| {
            item.trim().parse::<u32>().map_err(|e| ManifestError::Parse {
                line,
                message: format!("invalid sheet size '{}': {}", item.trim(), e),
            })
        })
        .collect()
}

fn has_line_break(s: &str) -> bool {
    s.contains('\n') || s.contains('\r')
}

fn parse_int(s: &str, line: usize, field: &str) -> Result<u32, ManifestError> {
    s.trim().parse::<u32>().map_err(|e| ManifestError::Parse {
        line,
        message: format!("invalid {} '{}': {}", field, s, e),
    })
}
