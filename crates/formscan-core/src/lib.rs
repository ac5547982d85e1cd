//! formscan-core: Backend-independent geometry and heuristics for finding
//! fillable regions on flat (non-interactive) PDF pages.
//!
//! Per page, horizontal fill lines are detected on a rendered raster with a
//! probabilistic Hough transform and underscore blanks are found in the
//! page text. Candidates are merged into regions, each region is named from
//! the text to its left, and the document's regions are assembled into a
//! normalised [`Blueprint`].
//!
//! This crate performs no I/O; page rasters and text tokens are supplied by
//! the caller.

pub mod blueprint;
pub mod error;
pub mod geometry;
pub mod hough;
pub mod label;
pub mod line_detector;
pub mod merge;
pub mod pipeline;
pub mod settings;
pub mod text_scan;
pub mod token;

pub use image::{GrayImage, Luma};
pub use blueprint::{Blueprint, BlueprintAssembler, FieldType, FormField};
pub use error::{AnalysisError, AnalysisResult, AnalysisWarning, WarningCode};
pub use geometry::{BBox, POINTS_PER_INCH, PageSize, Point};
pub use hough::{HoughParams, LineSegment, probabilistic_hough};
pub use label::{
    LabelOutcome, LabelSettings, UniqueNamer, associate_label, clean_label_text, context_rect,
    sanitize_field_name,
};
pub use line_detector::{LineDetection, LineDetectorSettings, LineStats, detect_lines};
pub use merge::{FieldCandidate, FieldRegion, FieldSource, merge_candidates, merge_rects};
pub use pipeline::{LabeledRegion, PageFields, PageInput, PageStats, Raster, analyze_page};
pub use settings::{HeuristicSettings, MergeSettings};
pub use text_scan::{
    TextScanSettings, UnderscorePolicy, colon_label_fields, is_colon_label, is_fill_token,
    scan_underscore_fields,
};
pub use token::TextToken;
