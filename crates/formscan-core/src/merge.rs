//! Fusing candidate rectangles into field regions.

use std::fmt;

use tracing::warn;

use crate::error::{AnalysisResult, AnalysisWarning, WarningCode};
use crate::geometry::BBox;

/// Which detector produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum FieldSource {
    /// A horizontal rule found on the raster.
    Line,
    /// An underscore run in the page text.
    Underscore,
    /// Space synthesised after a colon label.
    ColonLabel,
    /// A region fused from candidates of different sources.
    Mixed,
}

impl FieldSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldSource::Line => "line",
            FieldSource::Underscore => "underscore",
            FieldSource::ColonLabel => "colon_label",
            FieldSource::Mixed => "mixed",
        }
    }

    /// Source of a region fused from `self` and `other`.
    pub fn combine(self, other: FieldSource) -> FieldSource {
        if self == other { self } else { FieldSource::Mixed }
    }
}

impl fmt::Display for FieldSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A candidate rectangle in PDF points from a single detector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldCandidate {
    pub bbox: BBox,
    /// 1-based page number.
    pub page_number: usize,
    pub source: FieldSource,
}

impl FieldCandidate {
    pub fn new(bbox: BBox, page_number: usize, source: FieldSource) -> Self {
        Self {
            bbox,
            page_number,
            source,
        }
    }
}

/// One fillable area after merging, prior to naming.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldRegion {
    pub bbox: BBox,
    /// 1-based page number.
    pub page_number: usize,
    pub source: FieldSource,
}

/// Merge rectangles that overlap or lie within `tolerance` of each other.
///
/// The result is pairwise separated by more than `tolerance`, ordered by
/// `(top, x0)`, and merging it again returns it unchanged.
pub fn merge_rects(rects: &[BBox], tolerance: f64) -> Vec<BBox> {
    let items = rects.iter().map(|r| (*r, ())).collect();
    merge_with(items, tolerance, |_, _| ())
        .into_iter()
        .map(|(r, _)| r)
        .collect()
}

/// Merge a page's candidates into field regions.
///
/// Degenerate candidates are dropped with a [`WarningCode::DegenerateRect`]
/// warning before merging.
pub fn merge_candidates(
    candidates: &[FieldCandidate],
    tolerance: f64,
    page_number: usize,
) -> AnalysisResult<Vec<FieldRegion>> {
    let mut warnings = Vec::new();
    let mut items = Vec::with_capacity(candidates.len());
    for c in candidates {
        if c.bbox.is_degenerate() {
            warn!(page = page_number, bbox = ?c.bbox, source = %c.source, "skipping degenerate candidate");
            warnings.push(AnalysisWarning::on_page(
                WarningCode::DegenerateRect,
                format!(
                    "{} candidate ({:.1}, {:.1}, {:.1}, {:.1}) has no area",
                    c.source, c.bbox.x0, c.bbox.top, c.bbox.x1, c.bbox.bottom
                ),
                page_number,
            ));
            continue;
        }
        items.push((c.bbox, c.source));
    }

    let regions = merge_with(items, tolerance, FieldSource::combine)
        .into_iter()
        .map(|(bbox, source)| FieldRegion {
            bbox,
            page_number,
            source,
        })
        .collect();
    AnalysisResult::with_warnings(regions, warnings)
}

fn by_top_then_x0<T>(a: &(BBox, T), b: &(BBox, T)) -> std::cmp::Ordering {
    a.0.top
        .total_cmp(&b.0.top)
        .then_with(|| a.0.x0.total_cmp(&b.0.x0))
}

fn near(a: &BBox, b: &BBox, tolerance: f64) -> bool {
    a.expand(tolerance).intersects(b)
}

/// Sweep in `(top, x0)` order keeping a running union, then fuse any
/// closed-out regions that a later union grew into.
fn merge_with<T, F>(mut items: Vec<(BBox, T)>, tolerance: f64, combine: F) -> Vec<(BBox, T)>
where
    T: Copy,
    F: Fn(T, T) -> T,
{
    if items.len() <= 1 {
        return items;
    }
    items.sort_by(by_top_then_x0);

    let mut merged: Vec<(BBox, T)> = Vec::new();
    let mut current = items[0];
    for next in &items[1..] {
        if near(&current.0, &next.0, tolerance) {
            current = (current.0.union(&next.0), combine(current.1, next.1));
        } else {
            merged.push(current);
            current = *next;
        }
    }
    merged.push(current);

    // A union can reach back to a region that was already closed out.
    let mut changed = true;
    while changed {
        changed = false;
        'outer: for i in 0..merged.len() {
            for j in (i + 1)..merged.len() {
                if near(&merged[i].0, &merged[j].0, tolerance) {
                    let other = merged.remove(j);
                    merged[i] = (merged[i].0.union(&other.0), combine(merged[i].1, other.1));
                    changed = true;
                    break 'outer;
                }
            }
        }
    }

    merged.sort_by(by_top_then_x0);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_single() {
        assert!(merge_rects(&[], 5.0).is_empty());
        let r = BBox::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(merge_rects(&[r], 5.0), vec![r]);
    }

    #[test]
    fn overlapping_pair_becomes_union() {
        let a = BBox::new(100.0, 100.0, 200.0, 110.0);
        let b = BBox::new(150.0, 105.0, 260.0, 115.0);
        assert_eq!(merge_rects(&[a, b], 5.0), vec![a.union(&b)]);
    }

    #[test]
    fn near_adjacent_within_tolerance_merges() {
        let a = BBox::new(100.0, 100.0, 200.0, 110.0);
        let b = BBox::new(205.0, 100.0, 300.0, 110.0);
        assert_eq!(merge_rects(&[a, b], 5.0), vec![BBox::new(100.0, 100.0, 300.0, 110.0)]);
    }

    #[test]
    fn distant_rects_stay_separate() {
        let a = BBox::new(100.0, 100.0, 200.0, 110.0);
        let b = BBox::new(100.0, 200.0, 200.0, 210.0);
        let c = BBox::new(206.0, 100.0, 300.0, 110.0);
        assert_eq!(merge_rects(&[b, c, a], 5.0), vec![a, c, b]);
    }

    #[test]
    fn tolerance_applies_on_the_left_too() {
        // Sorted by top, the second rect lies to the left of the first.
        let a = BBox::new(200.0, 100.0, 300.0, 110.0);
        let b = BBox::new(100.0, 101.0, 196.0, 111.0);
        assert_eq!(merge_rects(&[a, b], 5.0).len(), 1);
    }

    #[test]
    fn late_union_reaches_closed_region() {
        let a = BBox::new(300.0, 100.0, 400.0, 110.0);
        let b = BBox::new(0.0, 105.0, 100.0, 115.0);
        let c = BBox::new(90.0, 110.0, 310.0, 120.0);
        // a and b are far apart; c bridges them but sorts after both.
        let merged = merge_rects(&[a, b, c], 5.0);
        assert_eq!(merged, vec![BBox::new(0.0, 100.0, 400.0, 120.0)]);
    }

    #[test]
    fn merge_is_idempotent() {
        let rects = vec![
            BBox::new(0.0, 0.0, 50.0, 10.0),
            BBox::new(48.0, 2.0, 120.0, 12.0),
            BBox::new(300.0, 0.0, 360.0, 10.0),
            BBox::new(0.0, 100.0, 80.0, 110.0),
            BBox::new(10.0, 112.0, 60.0, 118.0),
            BBox::new(500.0, 500.0, 510.0, 505.0),
        ];
        let once = merge_rects(&rects, 5.0);
        let twice = merge_rects(&once, 5.0);
        assert_eq!(once, twice);
        for (i, a) in once.iter().enumerate() {
            for b in &once[i + 1..] {
                assert!(!a.expand(5.0).intersects(b));
            }
        }
    }

    #[test]
    fn candidates_track_sources() {
        let line = FieldCandidate::new(BBox::new(145.0, 96.0, 300.0, 104.0), 1, FieldSource::Line);
        let score = FieldCandidate::new(
            BBox::new(145.0, 100.0, 300.0, 110.0),
            1,
            FieldSource::Underscore,
        );
        let other = FieldCandidate::new(
            BBox::new(145.0, 300.0, 300.0, 310.0),
            1,
            FieldSource::Underscore,
        );
        let result = merge_candidates(&[line, score, other], 5.0, 1);
        assert!(result.is_clean());
        let regions = result.value;
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].source, FieldSource::Mixed);
        assert_eq!(regions[0].bbox, BBox::new(145.0, 96.0, 300.0, 110.0));
        assert_eq!(regions[1].source, FieldSource::Underscore);
        assert_eq!(regions[1].page_number, 1);
    }

    #[test]
    fn degenerate_candidates_are_skipped_with_warning() {
        let flat = FieldCandidate::new(BBox::new(10.0, 50.0, 90.0, 50.0), 2, FieldSource::Line);
        let good = FieldCandidate::new(BBox::new(10.0, 80.0, 90.0, 90.0), 2, FieldSource::Line);
        let result = merge_candidates(&[flat, good], 5.0, 2);
        assert_eq!(result.value.len(), 1);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].code, WarningCode::DegenerateRect);
    }

    #[test]
    fn source_combination() {
        assert_eq!(FieldSource::Line.combine(FieldSource::Line), FieldSource::Line);
        assert_eq!(
            FieldSource::Line.combine(FieldSource::Underscore),
            FieldSource::Mixed
        );
        assert_eq!(FieldSource::ColonLabel.to_string(), "colon_label");
    }
}
