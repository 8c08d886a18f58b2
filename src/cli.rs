//! Command-line interface implementation

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::config::{self, CliOverrides};
use crate::coordinator::{
    self, AssumeYes, Confirmer, ExportError, ExportRequest, NoAssembler, Outcome,
    PlaceholderRenderer,
};
use crate::layout::{self, LayoutVerdict, SheetLayoutRequest};
use crate::manifest::{BitDepth, FileFormat};

/// Exit codes
const EXIT_SUCCESS: u8 = 0;
const EXIT_ERROR: u8 = 1;
const EXIT_INVALID_ARGS: u8 = 2;

/// Spritestage - validate sheet layouts and stage rendered frames for assembly
#[derive(Parser)]
#[command(name = "sst")]
#[command(about = "Spritestage - validate sheet layouts and stage rendered frames for assembly")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Layout and save options shared by the subcommands
#[derive(clap::Args)]
pub struct SheetArgs {
    /// Path to sheet.toml (default: discovered by walking up from cwd)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Project root holding the FrameExports tree
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Output sheet name (default: T_<project name>)
    #[arg(short, long)]
    pub name: Option<String>,

    /// Columns in the sheet grid
    #[arg(long)]
    pub columns: Option<u32>,

    /// Rows in the sheet grid
    #[arg(long)]
    pub rows: Option<u32>,

    /// Frame width in pixels
    #[arg(long)]
    pub frame_width: Option<u32>,

    /// Frame height in pixels
    #[arg(long)]
    pub frame_height: Option<u32>,

    /// Number of frames available to render (default: columns * rows)
    #[arg(long)]
    pub frames: Option<u32>,

    /// Sheet sizes to auto-save, comma separated (e.g. 2048,1024)
    #[arg(long, value_delimiter = ',')]
    pub sizes: Option<Vec<u32>>,

    /// Output format: png or tga
    #[arg(long)]
    pub format: Option<String>,

    /// Output bit depth: 24 or 32 (24-bit is TGA-only)
    #[arg(long)]
    pub bit_depth: Option<u8>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a full export: validate, stage, render placeholder frames, write the manifest
    Export {
        #[command(flatten)]
        sheet: SheetArgs,

        /// Disable downstream auto-save for this run
        #[arg(long)]
        no_auto_save: bool,

        /// Answer yes to layout confirmation prompts
        #[arg(short, long)]
        yes: bool,

        /// Manifest destination (default: <staging dir>/<sheet name>.manifest)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Check a sheet layout without touching the filesystem
    Validate {
        #[command(flatten)]
        sheet: SheetArgs,

        /// Emit the verdict as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Run the CLI application
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Export {
            sheet,
            no_auto_save,
            yes,
            output,
        } => run_export(&sheet, no_auto_save, yes, output),
        Commands::Validate { sheet, json } => run_validate(&sheet, json),
    }
}

/// Operator confirmation over stdin
struct StdinConfirmer;

impl Confirmer for StdinConfirmer {
    fn confirm(&mut self, warning: &str) -> bool {
        eprintln!("WARNING: {}", warning);
        eprint!("Proceed? [y/N] ");
        let _ = io::stderr().flush();

        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        let answer = answer.trim();
        answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes")
    }
}

/// Load config, apply CLI overrides, and resolve the layout request.
fn resolve(
    args: &SheetArgs,
) -> Result<(config::SheetConfig, SheetLayoutRequest), (String, u8)> {
    let mut cfg = config::load_config(args.config.as_deref())
        .map_err(|e| (e.to_string(), EXIT_INVALID_ARGS))?;

    let format = match args.format.as_deref() {
        None => None,
        Some("png") | Some("PNG") => Some(FileFormat::Png),
        Some("tga") | Some("TGA") => Some(FileFormat::Tga),
        Some(other) => {
            return Err((
                format!("unknown format '{}', expected png or tga", other),
                EXIT_INVALID_ARGS,
            ))
        }
    };
    let bit_depth = match args.bit_depth {
        None => None,
        Some(value) => Some(
            BitDepth::try_from(value).map_err(|e| (e, EXIT_INVALID_ARGS))?,
        ),
    };

    let overrides = CliOverrides {
        root: args.root.clone(),
        sheet_name: args.name.clone(),
        columns: args.columns,
        rows: args.rows,
        frame_width: args.frame_width,
        frame_height: args.frame_height,
        auto_save: None,
        sizes: args.sizes.clone(),
        format,
        bit_depth,
    };
    config::merge_cli_overrides(&mut cfg, &overrides);
    config::finalize(&mut cfg).map_err(|e| (e.to_string(), EXIT_INVALID_ARGS))?;

    let available_frames = args
        .frames
        .unwrap_or(cfg.sheet.columns * cfg.sheet.rows);
    let request = SheetLayoutRequest::new(
        cfg.sheet.frame_width,
        cfg.sheet.frame_height,
        cfg.sheet.columns,
        cfg.sheet.rows,
        available_frames,
    )
    .map_err(|e| (e.to_string(), EXIT_INVALID_ARGS))?;

    Ok((cfg, request))
}

/// Execute the export command
fn run_export(
    args: &SheetArgs,
    no_auto_save: bool,
    yes: bool,
    output: Option<PathBuf>,
) -> ExitCode {
    let (cfg, layout) = match resolve(args) {
        Ok(resolved) => resolved,
        Err((message, code)) => {
            eprintln!("Error: {}", message);
            return ExitCode::from(code);
        }
    };

    let request = ExportRequest {
        project_name: cfg.project.name.clone(),
        project_root: cfg.project.root.clone(),
        sheet_name: cfg.sheet_name(),
        layout,
        auto_save: cfg.sheet.auto_save && !no_auto_save,
        target_sheet_sizes: cfg.sheet.sizes.clone(),
        file_format: cfg.sheet.format,
        bit_depth: cfg.sheet.bit_depth,
        manifest_path: output,
    };

    // The external creative application drives the library directly; the
    // CLI ships the placeholder renderer so the staging and handoff
    // contract can be exercised standalone.
    let mut renderer = PlaceholderRenderer::default();
    let mut assembler = NoAssembler;

    let result = if yes {
        coordinator::run(&request, &mut renderer, &mut AssumeYes, &mut assembler)
    } else {
        coordinator::run(&request, &mut renderer, &mut StdinConfirmer, &mut assembler)
    };

    match result {
        Ok(Outcome::Completed {
            manifest_path,
            staging,
        }) => {
            println!("Staged {} frames in '{}'", layout.cell_count(), staging.path.display());
            println!("Manifest written to '{}'", manifest_path.display());
            ExitCode::from(EXIT_SUCCESS)
        }
        Ok(Outcome::Cancelled) => {
            eprintln!("Export cancelled.");
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::from(export_exit_code(&err))
        }
    }
}

/// Exit code for a failed export. Bad input (sheet name, layout) is an
/// argument error; everything else is a runtime failure.
fn export_exit_code(err: &ExportError) -> u8 {
    match err {
        ExportError::EmptySheetName
        | ExportError::InvalidSheetName(_)
        | ExportError::LayoutRejected(_) => EXIT_INVALID_ARGS,
        _ => EXIT_ERROR,
    }
}

/// Exit code for a validation verdict. A rejected layout maps to the same
/// argument-error code a rejected export run produces.
fn verdict_exit_code(verdict: &LayoutVerdict) -> u8 {
    match verdict {
        LayoutVerdict::Rejected { .. } => EXIT_INVALID_ARGS,
        _ => EXIT_SUCCESS,
    }
}

/// Machine-readable verdict report for `validate --json`
#[derive(Serialize)]
struct VerdictReport<'a> {
    sheet_name: &'a str,
    request: &'a SheetLayoutRequest,
    #[serde(flatten)]
    verdict: &'a LayoutVerdict,
}

/// Execute the validate command
fn run_validate(args: &SheetArgs, json: bool) -> ExitCode {
    let (cfg, request) = match resolve(args) {
        Ok(resolved) => resolved,
        Err((message, code)) => {
            eprintln!("Error: {}", message);
            return ExitCode::from(code);
        }
    };

    let sheet_name = cfg.sheet_name();
    let verdict = layout::validate(&request);

    if json {
        let report = VerdictReport {
            sheet_name: &sheet_name,
            request: &request,
            verdict: &verdict,
        };
        match serde_json::to_string_pretty(&report) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::from(EXIT_ERROR);
            }
        }
    } else {
        match &verdict {
            LayoutVerdict::Accepted { .. } => {
                println!(
                    "Layout OK: {}x{} frames of {}x{} px ({}x{} px sheet), auto-save eligible",
                    request.columns,
                    request.rows,
                    request.frame_width,
                    request.frame_height,
                    request.final_width(),
                    request.final_height(),
                );
            }
            LayoutVerdict::Rejected { reason } => {
                eprintln!("Layout rejected: {}", reason);
            }
            LayoutVerdict::NeedsConfirmation { reason } => {
                println!("Layout needs confirmation: {}", reason);
            }
        }
    }

    ExitCode::from(verdict_exit_code(&verdict))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{ConfirmReason, RejectReason};

    #[test]
    fn test_rejected_layout_exit_code_matches_across_commands() {
        let reason = RejectReason::FrameCountMismatch {
            expected: 16,
            actual: 15,
        };
        let verdict = LayoutVerdict::Rejected { reason };
        let export_err = ExportError::LayoutRejected(reason);

        assert_eq!(verdict_exit_code(&verdict), EXIT_INVALID_ARGS);
        assert_eq!(export_exit_code(&export_err), EXIT_INVALID_ARGS);
        assert_eq!(verdict_exit_code(&verdict), export_exit_code(&export_err));
    }

    #[test]
    fn test_acceptable_verdicts_exit_success() {
        assert_eq!(
            verdict_exit_code(&LayoutVerdict::Accepted {
                auto_save_eligible: true,
            }),
            EXIT_SUCCESS
        );
        assert_eq!(
            verdict_exit_code(&LayoutVerdict::NeedsConfirmation {
                reason: ConfirmReason::SuboptimalDimensions {
                    width: 768,
                    height: 1280,
                },
            }),
            EXIT_SUCCESS
        );
    }

    #[test]
    fn test_bad_sheet_names_are_argument_errors() {
        assert_eq!(export_exit_code(&ExportError::EmptySheetName), EXIT_INVALID_ARGS);
        assert_eq!(
            export_exit_code(&ExportError::InvalidSheetName("a/b".to_string())),
            EXIT_INVALID_ARGS
        );
    }
}
