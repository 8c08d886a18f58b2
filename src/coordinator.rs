//! Export coordination - sequences validation, staging, rendering, and handoff
//!
//! The coordinator is deliberately thin: validate the layout, obtain operator
//! confirmation when needed, allocate a staging directory, trigger the
//! external render, write the manifest, and hand the manifest path to the
//! downstream assembler. Aborting before the staging step leaves the
//! filesystem exactly as it was.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::layout::{self, LayoutVerdict, RejectReason, SheetLayoutRequest};
use crate::manifest::{expected_frame_paths, BitDepth, ExportManifest, FileFormat, ManifestError};
use crate::staging::{self, StagingError, StagingLocation};

/// Opaque error from an external collaborator (renderer or assembler)
pub type CollaboratorError = Box<dyn std::error::Error + Send + Sync>;

/// Everything the coordinator needs to run one export
#[derive(Debug, Clone)]
pub struct ExportRequest {
    /// Project name, used to namespace staging directories
    pub project_name: String,
    /// Project root the staging tree lives under
    pub project_root: PathBuf,
    /// Output sheet name (also the frame filename stem)
    pub sheet_name: String,
    /// Requested grid layout
    pub layout: SheetLayoutRequest,
    /// Whether the operator wants the finished sheet auto-saved
    pub auto_save: bool,
    /// Sheet sizes to auto-save
    pub target_sheet_sizes: Vec<u32>,
    /// Frame and sheet image format
    pub file_format: FileFormat,
    /// Export bit depth
    pub bit_depth: BitDepth,
    /// Manifest destination; defaults to `<staging>/<sheet_name>.manifest`
    pub manifest_path: Option<PathBuf>,
}

/// What the render front-end is asked to produce
#[derive(Debug)]
pub struct RenderPlan<'a> {
    /// Directory the frames must land in
    pub staging_dir: &'a Path,
    /// Width of each frame in pixels
    pub frame_width: u32,
    /// Height of each frame in pixels
    pub frame_height: u32,
    /// Image format of each frame
    pub file_format: FileFormat,
    /// Bit depth of each frame
    pub bit_depth: BitDepth,
    /// Exact output path for every frame, in render order
    pub frame_paths: &'a [PathBuf],
}

/// External render trigger: produces one image file per entry in
/// [`RenderPlan::frame_paths`].
pub trait FrameRenderer {
    fn render(&mut self, plan: &RenderPlan<'_>) -> Result<(), CollaboratorError>;
}

/// Operator yes/no decision point, invoked only for layouts that need
/// confirmation.
pub trait Confirmer {
    fn confirm(&mut self, warning: &str) -> bool;
}

/// Downstream consumer: reads the manifest once and assembles the sheet.
pub trait SheetAssembler {
    fn assemble(&mut self, manifest_path: &Path) -> Result<(), CollaboratorError>;
}

/// Confirmer that accepts every warning (CLI `--yes`)
pub struct AssumeYes;

impl Confirmer for AssumeYes {
    fn confirm(&mut self, _warning: &str) -> bool {
        true
    }
}

/// Assembler that does nothing; used when no downstream step is wired up
/// and the manifest itself is the deliverable.
pub struct NoAssembler;

impl SheetAssembler for NoAssembler {
    fn assemble(&mut self, _manifest_path: &Path) -> Result<(), CollaboratorError> {
        Ok(())
    }
}

/// Built-in renderer writing solid-color placeholder frames.
///
/// Lets the staging and handoff path be exercised end-to-end without the
/// external creative application.
pub struct PlaceholderRenderer {
    /// RGBA fill color for every frame
    pub color: [u8; 4],
}

impl Default for PlaceholderRenderer {
    fn default() -> Self {
        // Opaque mid-grey
        Self {
            color: [128, 128, 128, 255],
        }
    }
}

impl FrameRenderer for PlaceholderRenderer {
    fn render(&mut self, plan: &RenderPlan<'_>) -> Result<(), CollaboratorError> {
        let [r, g, b, a] = self.color;
        for path in plan.frame_paths {
            match plan.bit_depth {
                BitDepth::ThirtyTwo => {
                    let frame = image::RgbaImage::from_pixel(
                        plan.frame_width,
                        plan.frame_height,
                        image::Rgba([r, g, b, a]),
                    );
                    frame.save(path)?;
                }
                BitDepth::TwentyFour => {
                    let frame = image::RgbImage::from_pixel(
                        plan.frame_width,
                        plan.frame_height,
                        image::Rgb([r, g, b]),
                    );
                    frame.save(path)?;
                }
            }
        }
        Ok(())
    }
}

/// How an export run ended
#[derive(Debug)]
pub enum Outcome {
    /// Pipeline ran to completion
    Completed {
        /// Where the manifest was written
        manifest_path: PathBuf,
        /// The staging directory holding the rendered frames
        staging: StagingLocation,
    },
    /// Operator declined a confirmation; nothing was created on disk
    Cancelled,
}

/// Error aborting an export run
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExportError {
    /// Sheet name precondition: empty or whitespace-only names block progress
    #[error("sheet name must not be empty")]
    EmptySheetName,
    /// Sheet name would escape the staging directory when used as the frame
    /// filename stem or the manifest filename
    #[error("invalid sheet name {0:?}: must not contain path separators")]
    InvalidSheetName(String),
    /// Layout validation refused the request
    #[error("layout rejected: {0}")]
    LayoutRejected(RejectReason),
    /// Staging directory allocation failed
    #[error(transparent)]
    Staging(#[from] StagingError),
    /// Manifest construction or write failed
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    /// External render trigger failed; no manifest was written
    #[error("render step failed: {0}")]
    Render(#[source] CollaboratorError),
    /// Downstream assembly trigger failed
    #[error("assembly step failed: {0}")]
    Assemble(#[source] CollaboratorError),
}

/// Run one export: validate, confirm, stage, render, write manifest, hand off.
///
/// Filesystem guarantees:
/// - a `Rejected` verdict or a declined confirmation returns before any
///   directory or file is created;
/// - the manifest is written only after the render trigger succeeds, so the
///   manifest's existence is the signal that a render fully completed;
/// - a staging directory left behind by a failed render is not rolled back
///   (it is harmless and namespaced by sequence number).
pub fn run<R, C, A>(
    req: &ExportRequest,
    renderer: &mut R,
    confirmer: &mut C,
    assembler: &mut A,
) -> Result<Outcome, ExportError>
where
    R: FrameRenderer,
    C: Confirmer,
    A: SheetAssembler,
{
    if req.sheet_name.trim().is_empty() {
        return Err(ExportError::EmptySheetName);
    }
    // The sheet name becomes the frame filename stem and the manifest
    // filename, so it gets the same single-component check as project names.
    if !staging::safe_path_component(&req.sheet_name) {
        return Err(ExportError::InvalidSheetName(req.sheet_name.clone()));
    }

    let mut auto_save = req.auto_save;
    match layout::validate(&req.layout) {
        LayoutVerdict::Rejected { reason } => {
            return Err(ExportError::LayoutRejected(reason));
        }
        LayoutVerdict::NeedsConfirmation { reason } => {
            if !confirmer.confirm(&reason.to_string()) {
                return Ok(Outcome::Cancelled);
            }
            // An irregular sheet cannot be resized to the accepted sizes.
            auto_save = false;
        }
        LayoutVerdict::Accepted { auto_save_eligible } => {
            auto_save = auto_save && auto_save_eligible;
        }
    }
    // Auto-saving with no target sizes selected is meaningless.
    if req.target_sheet_sizes.is_empty() {
        auto_save = false;
    }

    let staging = staging::allocate(&req.project_root, &req.project_name)?;
    let frame_paths = expected_frame_paths(
        &staging.path,
        &req.sheet_name,
        req.file_format,
        req.layout.cell_count(),
    );

    let plan = RenderPlan {
        staging_dir: &staging.path,
        frame_width: req.layout.frame_width,
        frame_height: req.layout.frame_height,
        file_format: req.file_format,
        bit_depth: req.bit_depth,
        frame_paths: &frame_paths,
    };
    renderer.render(&plan).map_err(ExportError::Render)?;

    let manifest = ExportManifest::new(
        req.sheet_name.clone(),
        req.project_root.clone(),
        req.layout.columns,
        req.layout.rows,
        req.layout.frame_width,
        req.layout.frame_height,
        auto_save,
        req.target_sheet_sizes.clone(),
        req.file_format,
        req.bit_depth,
        frame_paths,
    )?;

    let manifest_path = req.manifest_path.clone().unwrap_or_else(|| {
        staging
            .path
            .join(format!("{}.manifest", req.sheet_name))
    });
    manifest.write(&manifest_path)?;

    assembler.assemble(&manifest_path).map_err(ExportError::Assemble)?;

    Ok(Outcome::Completed {
        manifest_path,
        staging,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::staging::EXPORT_FOLDER_NAME;
    use std::fs;
    use tempfile::tempdir;

    /// Renderer that records the plan and touches every frame path
    struct TouchRenderer {
        calls: usize,
    }

    impl TouchRenderer {
        fn new() -> Self {
            Self { calls: 0 }
        }
    }

    impl FrameRenderer for TouchRenderer {
        fn render(&mut self, plan: &RenderPlan<'_>) -> Result<(), CollaboratorError> {
            self.calls += 1;
            for path in plan.frame_paths {
                fs::write(path, b"frame")?;
            }
            Ok(())
        }
    }

    struct FailingRenderer;

    impl FrameRenderer for FailingRenderer {
        fn render(&mut self, _plan: &RenderPlan<'_>) -> Result<(), CollaboratorError> {
            Err("render queue interrupted".into())
        }
    }

    struct AssumeNo;

    impl Confirmer for AssumeNo {
        fn confirm(&mut self, _warning: &str) -> bool {
            false
        }
    }

    /// Assembler that records the manifest path it was handed
    struct RecordingAssembler {
        seen: Option<PathBuf>,
    }

    impl SheetAssembler for RecordingAssembler {
        fn assemble(&mut self, manifest_path: &Path) -> Result<(), CollaboratorError> {
            self.seen = Some(manifest_path.to_path_buf());
            Ok(())
        }
    }

    fn request(root: &Path, columns: u32, rows: u32, frames: u32) -> ExportRequest {
        ExportRequest {
            project_name: "Explosion".to_string(),
            project_root: root.to_path_buf(),
            sheet_name: "T_Explosion".to_string(),
            layout: SheetLayoutRequest::new(512, 512, columns, rows, frames).unwrap(),
            auto_save: true,
            target_sheet_sizes: vec![2048, 1024],
            file_format: FileFormat::Png,
            bit_depth: BitDepth::ThirtyTwo,
            manifest_path: None,
        }
    }

    fn export_tree_is_untouched(root: &Path) -> bool {
        !root.join(EXPORT_FOLDER_NAME).exists()
    }

    #[test]
    fn test_completed_run_writes_frames_and_manifest() {
        let root = tempdir().unwrap();
        let req = request(root.path(), 4, 4, 16);
        let mut renderer = TouchRenderer::new();
        let mut assembler = RecordingAssembler { seen: None };

        let outcome = run(&req, &mut renderer, &mut AssumeYes, &mut assembler).unwrap();
        let (manifest_path, staging) = match outcome {
            Outcome::Completed {
                manifest_path,
                staging,
            } => (manifest_path, staging),
            other => panic!("expected Completed, got {:?}", other),
        };

        assert_eq!(renderer.calls, 1);
        assert_eq!(staging.sequence, 1);
        assert_eq!(assembler.seen.as_deref(), Some(manifest_path.as_path()));

        let manifest = ExportManifest::parse(&manifest_path).unwrap();
        assert_eq!(manifest.frame_paths.len(), 16);
        assert!(manifest.auto_save);
        for path in &manifest.frame_paths {
            assert!(path.exists(), "missing rendered frame {:?}", path);
        }
    }

    #[test]
    fn test_rejected_layout_has_no_side_effects() {
        let root = tempdir().unwrap();
        let req = request(root.path(), 4, 4, 15);
        let mut renderer = TouchRenderer::new();

        let err = run(&req, &mut renderer, &mut AssumeYes, &mut NoAssembler).unwrap_err();
        assert!(matches!(err, ExportError::LayoutRejected(_)));
        assert_eq!(renderer.calls, 0);
        assert!(export_tree_is_untouched(root.path()));
    }

    #[test]
    fn test_declined_confirmation_cancels_without_side_effects() {
        let root = tempdir().unwrap();
        // 3x5 grid of 512x512: not square, not an accepted footprint
        let req = request(root.path(), 3, 5, 15);
        let mut renderer = TouchRenderer::new();

        let outcome = run(&req, &mut renderer, &mut AssumeNo, &mut NoAssembler).unwrap();
        assert!(matches!(outcome, Outcome::Cancelled));
        assert_eq!(renderer.calls, 0);
        assert!(export_tree_is_untouched(root.path()));
    }

    #[test]
    fn test_confirmed_suboptimal_layout_forces_auto_save_off() {
        let root = tempdir().unwrap();
        let req = request(root.path(), 3, 5, 15);

        let outcome = run(
            &req,
            &mut TouchRenderer::new(),
            &mut AssumeYes,
            &mut NoAssembler,
        )
        .unwrap();
        let manifest_path = match outcome {
            Outcome::Completed { manifest_path, .. } => manifest_path,
            other => panic!("expected Completed, got {:?}", other),
        };

        let manifest = ExportManifest::parse(&manifest_path).unwrap();
        assert!(!manifest.auto_save);
    }

    #[test]
    fn test_empty_size_list_forces_auto_save_off() {
        let root = tempdir().unwrap();
        let mut req = request(root.path(), 4, 4, 16);
        req.target_sheet_sizes.clear();

        let outcome = run(
            &req,
            &mut TouchRenderer::new(),
            &mut AssumeYes,
            &mut NoAssembler,
        )
        .unwrap();
        let manifest_path = match outcome {
            Outcome::Completed { manifest_path, .. } => manifest_path,
            other => panic!("expected Completed, got {:?}", other),
        };

        let manifest = ExportManifest::parse(&manifest_path).unwrap();
        assert!(!manifest.auto_save);
        assert!(manifest.target_sheet_sizes.is_empty());
    }

    #[test]
    fn test_empty_sheet_name_blocks_before_any_side_effect() {
        let root = tempdir().unwrap();
        let mut req = request(root.path(), 4, 4, 16);
        req.sheet_name = "   ".to_string();

        let err = run(
            &req,
            &mut TouchRenderer::new(),
            &mut AssumeYes,
            &mut NoAssembler,
        )
        .unwrap_err();
        assert!(matches!(err, ExportError::EmptySheetName));
        assert!(export_tree_is_untouched(root.path()));
    }

    #[test]
    fn test_sheet_name_with_separator_blocks_before_any_side_effect() {
        let root = tempdir().unwrap();
        let mut req = request(root.path(), 4, 4, 16);
        // A separator in the stem would scatter frames outside the
        // staging directory.
        req.sheet_name = "../T_Escape".to_string();

        let err = run(
            &req,
            &mut TouchRenderer::new(),
            &mut AssumeYes,
            &mut NoAssembler,
        )
        .unwrap_err();
        match err {
            ExportError::InvalidSheetName(name) => assert_eq!(name, "../T_Escape"),
            other => panic!("expected InvalidSheetName, got {:?}", other),
        }
        assert!(export_tree_is_untouched(root.path()));
    }

    #[test]
    fn test_failed_render_leaves_no_manifest() {
        let root = tempdir().unwrap();
        let req = request(root.path(), 4, 4, 16);

        let err = run(
            &req,
            &mut FailingRenderer,
            &mut AssumeYes,
            &mut NoAssembler,
        )
        .unwrap_err();
        assert!(matches!(err, ExportError::Render(_)));

        // The staging directory is allowed to remain, but it must not
        // contain a manifest - manifest existence signals a completed render.
        let staging = root.path().join(EXPORT_FOLDER_NAME).join("Explosion/001");
        assert!(staging.is_dir());
        let leftover: Vec<_> = fs::read_dir(&staging).unwrap().collect();
        assert!(leftover.is_empty());
    }

    #[test]
    fn test_consecutive_runs_use_fresh_staging_directories() {
        let root = tempdir().unwrap();
        let req = request(root.path(), 4, 4, 16);

        for expected_seq in 1..=2 {
            let outcome = run(
                &req,
                &mut TouchRenderer::new(),
                &mut AssumeYes,
                &mut NoAssembler,
            )
            .unwrap();
            match outcome {
                Outcome::Completed { staging, .. } => {
                    assert_eq!(staging.sequence, expected_seq)
                }
                other => panic!("expected Completed, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_placeholder_renderer_writes_decodable_frames() {
        let root = tempdir().unwrap();
        let mut req = request(root.path(), 2, 2, 4);
        req.layout = SheetLayoutRequest::new(32, 32, 2, 2, 4).unwrap();

        let outcome = run(
            &req,
            &mut PlaceholderRenderer::default(),
            &mut AssumeYes,
            &mut NoAssembler,
        )
        .unwrap();
        let manifest_path = match outcome {
            Outcome::Completed { manifest_path, .. } => manifest_path,
            other => panic!("expected Completed, got {:?}", other),
        };

        let manifest = ExportManifest::parse(&manifest_path).unwrap();
        for path in &manifest.frame_paths {
            let img = image::open(path).unwrap();
            assert_eq!(img.width(), 32);
            assert_eq!(img.height(), 32);
        }
    }
}
