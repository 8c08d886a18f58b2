//! Grid layout validation for sprite sheet exports
//!
//! Checks a proposed rows/columns layout against the available frame count
//! and the accepted square sheet sizes before any rendering is triggered.

use serde::Serialize;

/// Square sheet sizes (in pixels) that downstream texture pipelines accept.
pub const ACCEPTED_SHEET_SIZES: [u32; 6] = [2048, 1024, 512, 256, 128, 64];

/// A proposed sprite sheet layout, immutable once constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SheetLayoutRequest {
    /// Width of a single frame in pixels
    pub frame_width: u32,
    /// Height of a single frame in pixels
    pub frame_height: u32,
    /// Number of columns in the sheet grid
    pub columns: u32,
    /// Number of rows in the sheet grid
    pub rows: u32,
    /// Number of frames the front-end will actually render
    pub available_frames: u32,
}

/// Error building a [`SheetLayoutRequest`] from raw input
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum LayoutRequestError {
    /// Frame dimensions must be positive
    #[error("frame dimensions must be positive, got {width}x{height}")]
    ZeroFrameSize { width: u32, height: u32 },
    /// Grid dimensions must be positive
    #[error("grid must have at least one column and one row, got {columns}x{rows}")]
    ZeroGrid { columns: u32, rows: u32 },
    /// Sheet exceeds the addressable pixel range
    #[error(
        "sheet of {columns}x{rows} frames at {width}x{height} px exceeds the supported sheet size"
    )]
    Oversized {
        width: u32,
        height: u32,
        columns: u32,
        rows: u32,
    },
}

impl SheetLayoutRequest {
    /// Build a layout request, rejecting zero frame or grid dimensions and
    /// sheets whose dimensions or cell count would not fit in `u32`, so
    /// that the derived sheet math can rely on positivity and never wraps.
    pub fn new(
        frame_width: u32,
        frame_height: u32,
        columns: u32,
        rows: u32,
        available_frames: u32,
    ) -> Result<Self, LayoutRequestError> {
        if frame_width == 0 || frame_height == 0 {
            return Err(LayoutRequestError::ZeroFrameSize {
                width: frame_width,
                height: frame_height,
            });
        }
        if columns == 0 || rows == 0 {
            return Err(LayoutRequestError::ZeroGrid { columns, rows });
        }
        let fits = columns.checked_mul(frame_width).is_some()
            && rows.checked_mul(frame_height).is_some()
            && columns.checked_mul(rows).is_some();
        if !fits {
            return Err(LayoutRequestError::Oversized {
                width: frame_width,
                height: frame_height,
                columns,
                rows,
            });
        }
        Ok(Self {
            frame_width,
            frame_height,
            columns,
            rows,
            available_frames,
        })
    }

    /// Total sheet width in pixels (columns * frame width)
    pub fn final_width(&self) -> u32 {
        self.columns * self.frame_width
    }

    /// Total sheet height in pixels (rows * frame height)
    pub fn final_height(&self) -> u32 {
        self.rows * self.frame_height
    }

    /// Number of cells in the grid (columns * rows)
    pub fn cell_count(&self) -> u32 {
        self.columns * self.rows
    }
}

/// Reason a layout was rejected outright
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectReason {
    /// Grid cell count does not match the number of frames to render
    FrameCountMismatch {
        /// Cells in the requested grid
        expected: u32,
        /// Frames the front-end will render
        actual: u32,
    },
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::FrameCountMismatch { expected, actual } => write!(
                f,
                "the number of available frames ({}) does not match the number of cells in the requested sheet ({})",
                actual, expected
            ),
        }
    }
}

/// Reason a layout needs explicit operator confirmation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConfirmReason {
    /// Sheet is neither square nor an accepted power-of-two footprint
    SuboptimalDimensions {
        /// Final sheet width in pixels
        width: u32,
        /// Final sheet height in pixels
        height: u32,
    },
}

impl std::fmt::Display for ConfirmReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfirmReason::SuboptimalDimensions { width, height } => write!(
                f,
                "resulting sheet size will be {}x{}, which is not square and not an accepted power-of-two size; if you proceed the sheet will not be auto-saved",
                width, height
            ),
        }
    }
}

/// Outcome of validating a [`SheetLayoutRequest`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum LayoutVerdict {
    /// Layout is acceptable as-is
    Accepted {
        /// Whether the finished sheet may be resized and saved automatically
        auto_save_eligible: bool,
    },
    /// Layout cannot proceed
    Rejected {
        /// Why the layout was refused
        reason: RejectReason,
    },
    /// Layout may proceed only with operator confirmation
    NeedsConfirmation {
        /// What the operator is being asked to accept
        reason: ConfirmReason,
    },
}

/// Validate a proposed sheet layout.
///
/// Rules, in order:
///
/// 1. The grid cell count must match the available frame count. A mismatch
///    is rejected before any sizing check, since a wrong count invalidates
///    any sizing conclusion.
/// 2. A sheet that is neither square nor an accepted power-of-two footprint
///    (the square root of its total pixel area landing exactly on one of
///    [`ACCEPTED_SHEET_SIZES`]) needs operator confirmation; proceeding
///    costs auto-save eligibility.
/// 3. Everything else is accepted with auto-save eligible.
pub fn validate(req: &SheetLayoutRequest) -> LayoutVerdict {
    let cells = req.cell_count();
    if cells != req.available_frames {
        return LayoutVerdict::Rejected {
            reason: RejectReason::FrameCountMismatch {
                expected: cells,
                actual: req.available_frames,
            },
        };
    }

    let final_width = req.final_width();
    let final_height = req.final_height();
    let square = final_width == final_height;
    let power_of_two = exact_sqrt(u64::from(final_width) * u64::from(final_height))
        .map(|root| ACCEPTED_SHEET_SIZES.iter().any(|&s| u64::from(s) == root))
        .unwrap_or(false);

    if !square && !power_of_two {
        return LayoutVerdict::NeedsConfirmation {
            reason: ConfirmReason::SuboptimalDimensions {
                width: final_width,
                height: final_height,
            },
        };
    }

    LayoutVerdict::Accepted {
        auto_save_eligible: true,
    }
}

/// Integer square root if `n` is a perfect square.
///
/// Avoids float sqrt so large footprints cannot be misclassified by rounding.
fn exact_sqrt(n: u64) -> Option<u64> {
    let root = (n as f64).sqrt() as u64;
    // The float estimate can be off by one either way at u64 scale.
    for candidate in root.saturating_sub(1)..=root + 1 {
        if candidate.checked_mul(candidate) == Some(n) {
            return Some(candidate);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(
        frame_width: u32,
        frame_height: u32,
        columns: u32,
        rows: u32,
        available_frames: u32,
    ) -> SheetLayoutRequest {
        SheetLayoutRequest::new(frame_width, frame_height, columns, rows, available_frames)
            .unwrap()
    }

    #[test]
    fn test_zero_frame_size_rejected_at_construction() {
        let err = SheetLayoutRequest::new(0, 512, 4, 4, 16).unwrap_err();
        assert!(matches!(err, LayoutRequestError::ZeroFrameSize { .. }));
    }

    #[test]
    fn test_zero_grid_rejected_at_construction() {
        let err = SheetLayoutRequest::new(512, 512, 4, 0, 0).unwrap_err();
        assert!(matches!(err, LayoutRequestError::ZeroGrid { .. }));
    }

    #[test]
    fn test_oversized_grid_rejected_at_construction() {
        // 70_000 * 70_000 wraps u32; a wrapped cell count or sheet edge
        // must never reach the validation rules.
        let err = SheetLayoutRequest::new(70_000, 70_000, 70_000, 70_000, 0).unwrap_err();
        assert!(matches!(err, LayoutRequestError::Oversized { .. }));
    }

    #[test]
    fn test_largest_representable_grid_validates() {
        // 65_535^2 cells is the largest square grid that still fits in u32;
        // the sheet is square, so it validates cleanly.
        let verdict = validate(&request(1, 1, 65_535, 65_535, 65_535 * 65_535));
        assert_eq!(
            verdict,
            LayoutVerdict::Accepted {
                auto_save_eligible: true,
            }
        );
    }

    #[test]
    fn test_frame_count_mismatch_rejected() {
        // 4x4 grid but only 15 frames - rejected regardless of sizing
        let verdict = validate(&request(512, 512, 4, 4, 15));
        assert_eq!(
            verdict,
            LayoutVerdict::Rejected {
                reason: RejectReason::FrameCountMismatch {
                    expected: 16,
                    actual: 15,
                },
            }
        );
    }

    #[test]
    fn test_mismatch_checked_before_sizing() {
        // Sheet would be a perfect 2048x2048, but the count is wrong
        let verdict = validate(&request(512, 512, 4, 4, 12));
        assert!(matches!(verdict, LayoutVerdict::Rejected { .. }));
    }

    #[test]
    fn test_square_power_of_two_accepted() {
        // 4x4 grid of 512x512 frames -> 2048x2048, sqrt = 2048
        let verdict = validate(&request(512, 512, 4, 4, 16));
        assert_eq!(
            verdict,
            LayoutVerdict::Accepted {
                auto_save_eligible: true,
            }
        );
    }

    #[test]
    fn test_all_accepted_sizes_validate() {
        for &size in &ACCEPTED_SHEET_SIZES {
            let verdict = validate(&request(size / 2, size / 2, 2, 2, 4));
            assert_eq!(
                verdict,
                LayoutVerdict::Accepted {
                    auto_save_eligible: true,
                },
                "size {} should be accepted",
                size
            );
        }
    }

    #[test]
    fn test_square_but_unlisted_size_accepted() {
        // 3x3 grid of 100x100 frames -> 300x300: square, so acceptable
        // even though 300 is not in the accepted size list.
        let verdict = validate(&request(100, 100, 3, 3, 9));
        assert_eq!(
            verdict,
            LayoutVerdict::Accepted {
                auto_save_eligible: true,
            }
        );
    }

    #[test]
    fn test_non_square_non_power_of_two_needs_confirmation() {
        // 3x5 grid of 256x256 frames -> 768x1280, sqrt(983040) is not
        // an integer, so the operator must confirm.
        let verdict = validate(&request(256, 256, 3, 5, 15));
        assert_eq!(
            verdict,
            LayoutVerdict::NeedsConfirmation {
                reason: ConfirmReason::SuboptimalDimensions {
                    width: 768,
                    height: 1280,
                },
            }
        );
    }

    #[test]
    fn test_non_square_but_power_of_two_accepted() {
        // 2x1 grid of 512x256 frames -> 1024x256, area 262144, sqrt = 512
        // which is in the accepted list, so no confirmation is needed.
        let verdict = validate(&request(512, 256, 2, 1, 2));
        assert_eq!(
            verdict,
            LayoutVerdict::Accepted {
                auto_save_eligible: true,
            }
        );
    }

    #[test]
    fn test_reject_reason_message_states_counts() {
        let reason = RejectReason::FrameCountMismatch {
            expected: 16,
            actual: 15,
        };
        let msg = reason.to_string();
        assert!(msg.contains("15"));
        assert!(msg.contains("16"));
    }

    #[test]
    fn test_confirm_reason_message_states_dimensions() {
        let reason = ConfirmReason::SuboptimalDimensions {
            width: 768,
            height: 1280,
        };
        let msg = reason.to_string();
        assert!(msg.contains("768x1280"));
    }

    #[test]
    fn test_exact_sqrt() {
        assert_eq!(exact_sqrt(0), Some(0));
        assert_eq!(exact_sqrt(1), Some(1));
        assert_eq!(exact_sqrt(4), Some(2));
        assert_eq!(exact_sqrt(983040), None);
        assert_eq!(exact_sqrt(4194304), Some(2048));
        assert_eq!(exact_sqrt(4194305), None);
    }

    #[test]
    fn test_verdict_serializes_for_json_output() {
        let verdict = validate(&request(256, 256, 3, 5, 15));
        let json = serde_json::to_string(&verdict).unwrap();
        assert!(json.contains("needs_confirmation"));
        assert!(json.contains("suboptimal_dimensions"));
    }
}
