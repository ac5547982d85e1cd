//! Per-page analysis: detectors, merge and label association for one page.

use image::GrayImage;
use tracing::{debug, warn};

use crate::error::{AnalysisResult, AnalysisWarning, WarningCode};
use crate::geometry::PageSize;
use crate::label::{LabelOutcome, associate_label};
use crate::line_detector::{LineStats, detect_lines};
use crate::merge::{FieldCandidate, FieldRegion, FieldSource, merge_candidates};
use crate::settings::HeuristicSettings;
use crate::text_scan::{colon_label_fields, scan_underscore_fields};
use crate::token::TextToken;

/// A rendered page bitmap and the resolution it was rendered at.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    /// Dark-on-light grayscale page image.
    pub image: GrayImage,
    pub dpi: f64,
}

impl Raster {
    pub fn new(image: GrayImage, dpi: f64) -> Self {
        Self { image, dpi }
    }
}

/// Everything the pipeline needs to know about one page.
#[derive(Debug, Clone, Copy)]
pub struct PageInput<'a> {
    /// 1-based page number.
    pub page_number: usize,
    pub size: PageSize,
    pub tokens: &'a [TextToken],
    pub raster: Option<&'a Raster>,
    /// The page embeds images. Such pages are never skipped as sparse,
    /// whether or not a raster was rendered for them.
    pub has_images: bool,
}

/// A merged region with the label read for it.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledRegion {
    pub region: FieldRegion,
    /// Human-readable label (before identifier sanitisation).
    pub label: String,
}

/// Candidate and region counts for one page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageStats {
    pub lines: LineStats,
    pub underscore_candidates: usize,
    pub colon_candidates: usize,
    pub merged_regions: usize,
    /// Regions dropped by the excluded-term rule.
    pub excluded: usize,
    /// True if the page was skipped before detection.
    pub skipped: bool,
}

/// Labelled regions of one page, in merge order.
#[derive(Debug, Clone, PartialEq)]
pub struct PageFields {
    pub page_number: usize,
    pub page_size: PageSize,
    pub fields: Vec<LabeledRegion>,
    pub stats: PageStats,
}

impl PageFields {
    fn empty(input: &PageInput<'_>, skipped: bool) -> Self {
        Self {
            page_number: input.page_number,
            page_size: input.size,
            fields: Vec::new(),
            stats: PageStats {
                skipped,
                ..PageStats::default()
            },
        }
    }
}

fn is_sparse(input: &PageInput<'_>, min_chars: usize) -> bool {
    if min_chars == 0 || input.has_images {
        return false;
    }
    let chars: usize = input.tokens.iter().map(|t| t.text.chars().count()).sum();
    chars < min_chars
}

/// Run line detection, text scanning, merging and label association on one
/// page.
///
/// Never fails: per-page geometry problems become warnings and the offending
/// candidate is skipped.
pub fn analyze_page(input: &PageInput<'_>, settings: &HeuristicSettings) -> AnalysisResult<PageFields> {
    let page = input.page_number;
    let mut warnings = Vec::new();

    if !input.size.is_valid() {
        warn!(page, size = ?input.size, "skipping page with invalid size");
        warnings.push(AnalysisWarning::on_page(
            WarningCode::PageSkipped,
            format!(
                "page size {}x{} is not usable",
                input.size.width, input.size.height
            ),
            page,
        ));
        return AnalysisResult::with_warnings(PageFields::empty(input, true), warnings);
    }
    if is_sparse(input, settings.sparse_page_min_chars) {
        debug!(page, "page is sparse, skipping");
        return AnalysisResult::ok(PageFields::empty(input, true));
    }

    let mut stats = PageStats::default();
    let mut candidates = Vec::new();

    if let Some(raster) = input.raster {
        let lines = detect_lines(&raster.image, raster.dpi, &settings.line, page);
        warnings.extend(lines.warnings);
        stats.lines = lines.value.stats;
        candidates.extend(
            lines
                .value
                .rects
                .into_iter()
                .map(|r| FieldCandidate::new(r, page, FieldSource::Line)),
        );
    }

    let underscores = scan_underscore_fields(input.tokens, &settings.text.underscore_policy, page);
    warnings.extend(underscores.warnings);
    stats.underscore_candidates = underscores.value.len();
    debug!(page, count = stats.underscore_candidates, "underscore fields via text search");
    candidates.extend(
        underscores
            .value
            .into_iter()
            .map(|r| FieldCandidate::new(r, page, FieldSource::Underscore)),
    );

    if settings.text.colon_label_fields {
        let colons = colon_label_fields(
            input.tokens,
            input.size.width,
            &settings.label.excluded_terms,
            page,
        );
        warnings.extend(colons.warnings);
        stats.colon_candidates = colons.value.len();
        candidates.extend(
            colons
                .value
                .into_iter()
                .map(|r| FieldCandidate::new(r, page, FieldSource::ColonLabel)),
        );
    }

    let merged = merge_candidates(&candidates, settings.merge.tolerance, page);
    warnings.extend(merged.warnings);
    stats.merged_regions = merged.value.len();
    debug!(page, count = stats.merged_regions, "potential fields after merging");

    let mut fields = Vec::with_capacity(merged.value.len());
    for region in merged.value {
        match associate_label(
            &region,
            input.tokens,
            &settings.text.underscore_policy,
            &settings.label,
        ) {
            LabelOutcome::Named(label) | LabelOutcome::Fallback(label) => {
                fields.push(LabeledRegion { region, label });
            }
            LabelOutcome::Excluded(label) => {
                debug!(page, %label, "dropping region with excluded label");
                stats.excluded += 1;
            }
        }
    }

    AnalysisResult::with_warnings(
        PageFields {
            page_number: page,
            page_size: input.size,
            fields,
            stats,
        },
        warnings,
    )
}
