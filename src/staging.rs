//! Staging directory allocation for rendered frames
//!
//! Each export run gets a fresh, uniquely numbered directory under
//! `<project_root>/FrameExports/<project_name>/` so that no run ever
//! overwrites another run's frames.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Folder under the project root that holds all per-run staging directories
pub const EXPORT_FOLDER_NAME: &str = "FrameExports";

/// A freshly created, collision-free staging directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingLocation {
    /// Absolute or root-relative path of the created directory
    pub path: PathBuf,
    /// Run number within the project, starting at 1
    pub sequence: u32,
}

/// Error allocating a staging directory
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StagingError {
    /// Project name would produce an invalid staging path
    #[error("invalid project name {0:?}: must be non-empty and must not contain path separators")]
    InvalidProjectName(String),
    /// Directory creation failed (permissions, read-only volume, ...)
    #[error("failed to create staging directory {path:?}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Allocate and create the next free staging directory for a project.
///
/// Candidate paths are `<project_root>/FrameExports/<project_name>/NNN`
/// with `NNN` zero-padded to three digits, starting at `001`. Existing
/// directories are skipped, so repeated runs for the same project get
/// strictly increasing sequence numbers; distinct projects never collide.
///
/// The returned directory exists on disk. No locking is attempted against
/// concurrent external processes; the tool assumes a single operator
/// running one export at a time.
pub fn allocate(project_root: &Path, project_name: &str) -> Result<StagingLocation, StagingError> {
    validate_project_name(project_name)?;

    let project_dir = project_root.join(EXPORT_FOLDER_NAME).join(project_name);

    let mut sequence: u32 = 1;
    loop {
        let candidate = project_dir.join(format!("{:03}", sequence));
        if candidate.exists() {
            sequence += 1;
            continue;
        }
        fs::create_dir_all(&candidate).map_err(|source| StagingError::Create {
            path: candidate.clone(),
            source,
        })?;
        return Ok(StagingLocation {
            path: candidate,
            sequence,
        });
    }
}

/// True when `name` is safe to use as a single path component: non-empty
/// after trimming, not `..`, and free of separators and line breaks.
pub fn safe_path_component(name: &str) -> bool {
    let trimmed = name.trim();
    !trimmed.is_empty()
        && trimmed != ".."
        && !trimmed.contains('/')
        && !trimmed.contains('\\')
        && !trimmed.contains('\n')
        && !trimmed.contains('\r')
}

/// Reject names that are empty or would escape the staging namespace.
fn validate_project_name(name: &str) -> Result<(), StagingError> {
    if !safe_path_component(name) {
        return Err(StagingError::InvalidProjectName(name.to_string()));
    }
    Ok(())
}
