//! One configurable pipeline: every heuristic threshold in one place.

use tracing::warn;

use crate::error::AnalysisError;
use crate::label::LabelSettings;
use crate::line_detector::LineDetectorSettings;
use crate::text_scan::TextScanSettings;

/// Lowest rendering resolution accepted at all.
pub const MIN_DPI: f64 = 72.0;
/// Below this resolution thin rules start to break up; accepted with a warning.
pub const RECOMMENDED_MIN_DPI: f64 = 150.0;

/// Rectangle-merger tunables.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MergeSettings {
    /// Rectangles closer than this (PDF points) are fused.
    pub tolerance: f64,
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self { tolerance: 5.0 }
    }
}

/// All tunables of the heuristic field detector.
///
/// Deserialising a partial JSON object fills missing fields from
/// [`Default`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct HeuristicSettings {
    /// Resolution pages are rendered at for line detection.
    pub dpi: f64,
    pub line: LineDetectorSettings,
    pub text: TextScanSettings,
    pub merge: MergeSettings,
    pub label: LabelSettings,
    /// Pages with less text than this and no raster are skipped. 0 disables.
    pub sparse_page_min_chars: usize,
}

impl Default for HeuristicSettings {
    fn default() -> Self {
        Self {
            dpi: 300.0,
            line: LineDetectorSettings::default(),
            text: TextScanSettings::default(),
            merge: MergeSettings::default(),
            label: LabelSettings::default(),
            sparse_page_min_chars: 0,
        }
    }
}

fn non_negative(name: &str, value: f64) -> Result<(), AnalysisError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(AnalysisError::InvalidSettings(format!(
            "{name} must be a non-negative number, got {value}"
        )))
    }
}

impl HeuristicSettings {
    /// Check every setting is in range.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if !(self.dpi.is_finite() && self.dpi >= MIN_DPI) {
            return Err(AnalysisError::InvalidSettings(format!(
                "dpi must be at least {MIN_DPI}, got {}",
                self.dpi
            )));
        }
        if self.dpi < RECOMMENDED_MIN_DPI {
            warn!(
                dpi = self.dpi,
                "dpi below {RECOMMENDED_MIN_DPI}; thin fill lines may be missed"
            );
        }

        let line = &self.line;
        non_negative("line.vote_threshold_in", line.vote_threshold_in)?;
        non_negative("line.min_line_length_in", line.min_line_length_in)?;
        non_negative("line.max_line_gap_in", line.max_line_gap_in)?;
        non_negative("line.horizontal_tolerance_in", line.horizontal_tolerance_in)?;
        non_negative("line.table_row_tolerance_in", line.table_row_tolerance_in)?;
        non_negative("line.stroke_merge_in", line.stroke_merge_in)?;
        non_negative("line.vertical_padding_pt", line.vertical_padding_pt)?;
        if !(line.border_span_ratio > 0.0 && line.border_span_ratio <= 1.0) {
            return Err(AnalysisError::InvalidSettings(format!(
                "line.border_span_ratio must be in (0, 1], got {}",
                line.border_span_ratio
            )));
        }

        non_negative("merge.tolerance", self.merge.tolerance)?;

        let label = &self.label;
        non_negative("label.context_width", label.context_width)?;
        non_negative("label.margin", label.margin)?;
        non_negative("label.vertical_pad", label.vertical_pad)?;
        if label.max_name_len == 0 {
            return Err(AnalysisError::InvalidSettings(
                "label.max_name_len must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
