//! Fill-line detection on a rendered page raster.
//!
//! The page bitmap is inverted, run through the probabilistic Hough
//! transform, and the resulting segments are filtered down to isolated
//! horizontal rules: near-horizontal only, thick strokes consolidated, page
//! borders dropped, and stacked table rows dropped. Survivors are converted
//! to PDF-point rectangles with a little vertical padding.

use image::GrayImage;
use image::imageops;
use tracing::{debug, warn};

use crate::error::{AnalysisResult, AnalysisWarning, WarningCode};
use crate::geometry::BBox;
use crate::hough::{HoughParams, LineSegment, probabilistic_hough};

/// Line-detector tunables. Lengths are in inches so that they scale with
/// the rendering DPI; padding is in PDF points.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LineDetectorSettings {
    /// Minimum inverted intensity that counts as ink.
    pub ink_threshold: u8,
    /// Accumulator votes required, expressed as inches of stroke.
    pub vote_threshold_in: f64,
    /// Shortest reported segment.
    pub min_line_length_in: f64,
    /// Largest gap bridged within a segment.
    pub max_line_gap_in: f64,
    /// Largest vertical drift between endpoints of a "horizontal" segment.
    pub horizontal_tolerance_in: f64,
    /// Segments at least this fraction of the page width are borders.
    pub border_span_ratio: f64,
    /// Neighbours inspected on each side by the table rule.
    pub table_window: usize,
    /// Rows closer than this are considered part of a table grid.
    pub table_row_tolerance_in: f64,
    /// Only neighbours that share horizontal extent count towards the table
    /// rule. Off by default, so same-row lines in separate columns are
    /// treated as a table row.
    pub table_overlap_required: bool,
    /// Parallel segments closer than this are one thick stroke.
    pub stroke_merge_in: f64,
    /// Padding added above and below each line rectangle, in points.
    pub vertical_padding_pt: f64,
    /// Seed for the Hough pixel visiting order.
    pub seed: u64,
}

impl Default for LineDetectorSettings {
    fn default() -> Self {
        Self {
            ink_threshold: 128,
            vote_threshold_in: 0.5,
            min_line_length_in: 1.0,
            max_line_gap_in: 1.0 / 15.0,
            horizontal_tolerance_in: 1.0 / 15.0,
            border_span_ratio: 0.9,
            table_window: 5,
            table_row_tolerance_in: 0.1,
            table_overlap_required: false,
            stroke_merge_in: 1.0 / 75.0,
            vertical_padding_pt: 4.0,
            seed: 0,
        }
    }
}

fn inches_to_px(inches: f64, dpi: f64) -> f64 {
    (inches * dpi).round()
}

impl LineDetectorSettings {
    /// Hough parameters in pixels for a raster rendered at `dpi`.
    pub fn hough_params(&self, dpi: f64) -> HoughParams {
        HoughParams {
            threshold: inches_to_px(self.vote_threshold_in, dpi).max(1.0) as u32,
            min_line_length: inches_to_px(self.min_line_length_in, dpi).max(0.0) as u32,
            max_line_gap: inches_to_px(self.max_line_gap_in, dpi).max(0.0) as u32,
            foreground: self.ink_threshold,
            seed: self.seed,
            ..HoughParams::default()
        }
    }
}

/// Segment counts after each filtering stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineStats {
    /// Raw Hough output.
    pub found: usize,
    /// Near-horizontal segments.
    pub horizontal: usize,
    /// After thick strokes were consolidated.
    pub strokes: usize,
    /// After border rejection.
    pub non_border: usize,
    /// After the table rule.
    pub isolated: usize,
}

/// Output of [`detect_lines`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineDetection {
    /// Candidate fill-line rectangles in PDF points.
    pub rects: Vec<BBox>,
    pub stats: LineStats,
}

/// Keep segments whose endpoints differ vertically by less than `tolerance_px`.
pub fn filter_horizontal(segments: Vec<LineSegment>, tolerance_px: f64) -> Vec<LineSegment> {
    segments
        .into_iter()
        .filter(|s| (s.span_y() as f64) < tolerance_px)
        .collect()
}

/// Consolidate parallel segments belonging to one thick stroke.
///
/// Segments are clustered by mid-height, chaining each one onto the cluster
/// while it lies within `y_tolerance_px` of the segment below it, so a
/// stroke many pixels thick stays one cluster. Within a cluster, segments
/// whose x-extents overlap or lie within `x_gap_px` are joined into one
/// level segment at their mean height.
pub fn join_strokes(
    mut segments: Vec<LineSegment>,
    y_tolerance_px: f64,
    x_gap_px: f64,
) -> Vec<LineSegment> {
    if segments.is_empty() {
        return Vec::new();
    }
    segments.sort_by(|a, b| a.mid_y().total_cmp(&b.mid_y()));

    let mut result = Vec::new();
    let mut start = 0;
    for i in 1..=segments.len() {
        let end_of_cluster = i == segments.len()
            || segments[i].mid_y() - segments[i - 1].mid_y() > y_tolerance_px;
        if !end_of_cluster {
            continue;
        }

        let cluster = &mut segments[start..i];
        cluster.sort_by_key(|s| s.min_x());

        let mut cur = (cluster[0].min_x(), cluster[0].max_x());
        let mut ys = vec![cluster[0].mid_y()];
        for seg in &cluster[1..] {
            if (seg.min_x() as f64) <= cur.1 as f64 + x_gap_px {
                cur.1 = cur.1.max(seg.max_x());
                ys.push(seg.mid_y());
            } else {
                result.push(level_segment(cur, &ys, cluster[0].page_index));
                cur = (seg.min_x(), seg.max_x());
                ys = vec![seg.mid_y()];
            }
        }
        result.push(level_segment(cur, &ys, cluster[0].page_index));
        start = i;
    }

    result
}

fn level_segment(span: (i32, i32), ys: &[f64], page_index: usize) -> LineSegment {
    let y = (ys.iter().sum::<f64>() / ys.len() as f64).round() as i32;
    LineSegment::new(span.0, y, span.1, y).on_page(page_index)
}

/// Drop segments whose horizontal span reaches `ratio` of the page width.
pub fn reject_borders(segments: Vec<LineSegment>, page_width_px: f64, ratio: f64) -> Vec<LineSegment> {
    let limit = page_width_px * ratio;
    segments
        .into_iter()
        .filter(|s| (s.span_x() as f64) < limit)
        .collect()
}

/// Drop segments that sit in a stack of closely spaced rows.
///
/// Segments are ordered by height; each is compared with up to `window`
/// neighbours on either side and rejected if any of them lies within
/// `row_tolerance_px` vertically (and, when `require_overlap` is set,
/// shares some horizontal extent). Survivors keep height order.
pub fn reject_table_rows(
    mut segments: Vec<LineSegment>,
    window: usize,
    row_tolerance_px: f64,
    require_overlap: bool,
) -> Vec<LineSegment> {
    segments.sort_by_key(|s| s.y1);

    let n = segments.len();
    let in_table = |i: usize| {
        let line = &segments[i];
        let lo = i.saturating_sub(window);
        let hi = (i + window + 1).min(n);
        (lo..hi).filter(|&j| j != i).any(|j| {
            let other = &segments[j];
            let close = ((line.y1 - other.y1).abs() as f64) < row_tolerance_px;
            let overlaps = line.min_x() <= other.max_x() && other.min_x() <= line.max_x();
            close && (overlaps || !require_overlap)
        })
    };

    (0..n)
        .filter(|&i| !in_table(i))
        .map(|i| segments[i])
        .collect()
}

/// Convert a pixel-space segment to a padded PDF-point rectangle.
pub fn segment_to_rect(segment: &LineSegment, dpi: f64, vertical_padding_pt: f64) -> BBox {
    BBox::from_corners(
        segment.x1 as f64,
        segment.y1 as f64,
        segment.x2 as f64,
        segment.y2 as f64,
    )
    .pixels_to_points(dpi)
    .expand_vertical(vertical_padding_pt)
}

/// Detect isolated horizontal fill lines on a dark-on-light page raster.
///
/// `page_number` is 1-based and only used for warnings. An empty result is
/// not an error.
pub fn detect_lines(
    image: &GrayImage,
    dpi: f64,
    settings: &LineDetectorSettings,
    page_number: usize,
) -> AnalysisResult<LineDetection> {
    let mut stats = LineStats::default();
    if image.width() == 0 || image.height() == 0 || !(dpi.is_finite() && dpi > 0.0) {
        return AnalysisResult::ok(LineDetection::default());
    }

    let params = settings.hough_params(dpi);
    let mut inverted = image.clone();
    imageops::invert(&mut inverted);
    let segments: Vec<LineSegment> = probabilistic_hough(&inverted, &params)
        .into_iter()
        .map(|s| s.on_page(page_number.saturating_sub(1)))
        .collect();
    stats.found = segments.len();

    let horizontal = filter_horizontal(segments, settings.horizontal_tolerance_in * dpi);
    stats.horizontal = horizontal.len();

    let strokes = join_strokes(
        horizontal,
        settings.stroke_merge_in * dpi,
        params.max_line_gap as f64,
    );
    stats.strokes = strokes.len();

    let non_border = reject_borders(strokes, image.width() as f64, settings.border_span_ratio);
    stats.non_border = non_border.len();

    let isolated = reject_table_rows(
        non_border,
        settings.table_window,
        settings.table_row_tolerance_in * dpi,
        settings.table_overlap_required,
    );
    stats.isolated = isolated.len();

    debug!(
        page = page_number,
        found = stats.found,
        horizontal = stats.horizontal,
        non_border = stats.non_border,
        isolated = stats.isolated,
        "line detection"
    );

    let mut warnings = Vec::new();
    let mut rects = Vec::with_capacity(isolated.len());
    for seg in &isolated {
        let rect = segment_to_rect(seg, dpi, settings.vertical_padding_pt);
        if rect.is_degenerate() {
            warn!(page = page_number, ?seg, "skipping malformed line segment");
            warnings.push(AnalysisWarning::on_page(
                WarningCode::MalformedSegment,
                format!(
                    "segment ({}, {})-({}, {}) has no extent",
                    seg.x1, seg.y1, seg.x2, seg.y2
                ),
                page_number,
            ));
            continue;
        }
        rects.push(rect);
    }

    AnalysisResult::with_warnings(LineDetection { rects, stats }, warnings)
}

#[cfg(test)]
mod tests {
    use image::Luma;

    use super::*;

    fn h(x1: i32, x2: i32, y: i32) -> LineSegment {
        LineSegment::new(x1, y, x2, y)
    }

    fn page(width: u32, height: u32) -> GrayImage {
        GrayImage::from_pixel(width, height, Luma([255]))
    }

    fn ink(img: &mut GrayImage, x0: u32, y0: u32, x1: u32, y1: u32) {
        for y in y0..y1 {
            for x in x0..x1 {
                img.put_pixel(x, y, Luma([0]));
            }
        }
    }

    #[test]
    fn default_hough_params_at_300_dpi() {
        let p = LineDetectorSettings::default().hough_params(300.0);
        assert_eq!(p.threshold, 150);
        assert_eq!(p.min_line_length, 300);
        assert_eq!(p.max_line_gap, 20);
        assert_eq!(p.foreground, 128);
    }

    #[test]
    fn hough_params_scale_with_dpi() {
        let p = LineDetectorSettings::default().hough_params(150.0);
        assert_eq!(p.threshold, 75);
        assert_eq!(p.min_line_length, 150);
        assert_eq!(p.max_line_gap, 10);
    }

    #[test]
    fn horizontal_filter_uses_strict_tolerance() {
        let segs = vec![
            LineSegment::new(0, 100, 400, 100),
            LineSegment::new(0, 100, 400, 119),
            LineSegment::new(0, 100, 400, 120),
            LineSegment::new(50, 0, 50, 400),
        ];
        let kept = filter_horizontal(segs, 20.0);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn border_spanning_segments_are_rejected() {
        let segs = vec![h(0, 900, 50), h(20, 980, 60), h(100, 899, 300), h(100, 400, 500)];
        let kept = reject_borders(segs, 1000.0, 0.9);
        assert_eq!(kept, vec![h(100, 899, 300), h(100, 400, 500)]);
    }

    #[test]
    fn stacked_table_rows_are_rejected() {
        let segs: Vec<LineSegment> = (0..6).map(|i| h(100, 600, 100 + i * 20)).collect();
        assert!(reject_table_rows(segs, 5, 30.0, true).is_empty());
    }

    #[test]
    fn isolated_rows_survive_table_rule() {
        let segs = vec![h(100, 600, 500), h(100, 600, 100), h(100, 600, 300)];
        let kept = reject_table_rows(segs, 5, 30.0, true);
        let ys: Vec<i32> = kept.iter().map(|s| s.y1).collect();
        assert_eq!(ys, vec![100, 300, 500]);
    }

    #[test]
    fn side_by_side_lines_are_not_a_table_when_overlap_required() {
        let segs = vec![h(50, 250, 400), h(300, 550, 405)];
        assert_eq!(reject_table_rows(segs.clone(), 5, 30.0, true).len(), 2);
        assert!(reject_table_rows(segs, 5, 30.0, false).is_empty());
    }

    #[test]
    fn thick_stroke_is_joined() {
        let segs = vec![h(100, 500, 200), h(102, 498, 201), h(110, 505, 202)];
        let joined = join_strokes(segs, 4.0, 20.0);
        assert_eq!(joined, vec![h(100, 505, 201)]);
    }

    #[test]
    fn distant_collinear_pieces_stay_apart() {
        let segs = vec![h(100, 300, 200), h(310, 400, 200), h(500, 700, 200)];
        let joined = join_strokes(segs, 4.0, 20.0);
        assert_eq!(joined, vec![h(100, 400, 200), h(500, 700, 200)]);
    }

    #[test]
    fn stroke_is_chained_row_by_row() {
        // One segment per pixel row of an 8px rule; first and last are
        // further apart than the tolerance but each neighbour is close.
        let segs: Vec<LineSegment> = (0..8).map(|i| h(300, 699, 400 + i)).collect();
        let joined = join_strokes(segs, 4.0, 20.0);
        assert_eq!(joined.len(), 1);
        assert_eq!(joined[0].min_x(), 300);
        assert_eq!(joined[0].max_x(), 699);
    }

    #[test]
    fn join_keeps_separate_rows() {
        let segs = vec![h(0, 400, 100), h(0, 400, 120)];
        assert_eq!(join_strokes(segs, 4.0, 20.0).len(), 2);
    }

    #[test]
    fn segment_to_points_with_padding() {
        let rect = segment_to_rect(&h(300, 900, 600), 300.0, 4.0);
        assert!(rect.approx_eq(&BBox::new(72.0, 140.0, 216.0, 148.0), 1e-9));
    }

    #[test]
    fn blank_page_has_no_lines() {
        let img = page(850, 1100);
        let result = detect_lines(&img, 100.0, &LineDetectorSettings::default(), 1);
        assert!(result.value.rects.is_empty());
        assert!(result.is_clean());
    }

    #[test]
    fn detects_single_fill_line() {
        // 1000 x 800 px at 300 DPI; a 2px rule 400px long.
        let mut img = page(1000, 800);
        ink(&mut img, 300, 400, 700, 402);

        let result = detect_lines(&img, 300.0, &LineDetectorSettings::default(), 1);
        let det = result.value;
        assert_eq!(det.rects.len(), 1, "stats: {:?}", det.stats);
        let r = det.rects[0];
        assert!((r.x0 - 72.0).abs() < 0.5);
        assert!((r.x1 - 168.0).abs() < 0.5);
        assert!(r.top < 96.24 && r.bottom > 96.24);
        assert_eq!(det.stats.isolated, 1);
    }

    #[test]
    fn bold_rules_are_one_line_each() {
        for thickness in 6..=12 {
            let mut img = page(1000, 800);
            ink(&mut img, 300, 400, 700, 400 + thickness);

            let det = detect_lines(&img, 300.0, &LineDetectorSettings::default(), 1).value;
            assert_eq!(
                det.rects.len(),
                1,
                "thickness {thickness}px, stats: {:?}",
                det.stats
            );
            assert_eq!(det.stats.strokes, 1);
        }
    }

    #[test]
    fn same_row_columns_are_a_table_by_default() {
        // Letter width at 300 DPI, two 600px rules on one row.
        let mut img = page(2550, 800);
        ink(&mut img, 200, 400, 800, 402);
        ink(&mut img, 1200, 400, 1800, 402);

        let settings = LineDetectorSettings::default();
        assert!(!settings.table_overlap_required);
        let det = detect_lines(&img, 300.0, &settings, 1).value;
        assert_eq!(det.stats.non_border, 2, "stats: {:?}", det.stats);
        assert!(det.rects.is_empty());

        let overlapping_only = LineDetectorSettings {
            table_overlap_required: true,
            ..settings
        };
        let det = detect_lines(&img, 300.0, &overlapping_only, 1).value;
        assert_eq!(det.rects.len(), 2);
    }

    #[test]
    fn full_width_rule_is_treated_as_border() {
        let mut img = page(1000, 800);
        ink(&mut img, 20, 100, 980, 102);
        ink(&mut img, 300, 500, 700, 502);

        let det = detect_lines(&img, 300.0, &LineDetectorSettings::default(), 1).value;
        assert_eq!(det.rects.len(), 1, "stats: {:?}", det.stats);
        assert!(det.rects[0].top > 100.0);
        assert!(det.stats.strokes > det.stats.non_border);
    }

    #[test]
    fn rendered_table_grid_yields_nothing() {
        let mut img = page(1000, 800);
        for i in 0..6 {
            let y = 200 + i * 20;
            ink(&mut img, 200, y, 700, y + 2);
        }
        let det = detect_lines(&img, 300.0, &LineDetectorSettings::default(), 1).value;
        assert!(det.rects.is_empty(), "stats: {:?}", det.stats);
    }

    #[test]
    fn short_dashes_are_ignored() {
        let mut img = page(1000, 800);
        ink(&mut img, 100, 300, 250, 302);
        let det = detect_lines(&img, 300.0, &LineDetectorSettings::default(), 1).value;
        assert!(det.rects.is_empty());
    }
}
