//! Word-level text tokens supplied by the text-extraction collaborator.

use crate::geometry::BBox;

/// A word with its bounding box in PDF points (top-left origin).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TextToken {
    /// The token text as extracted.
    pub text: String,
    /// Bounding box in page points.
    pub bbox: BBox,
    /// 1-based page number.
    pub page_number: usize,
}

impl TextToken {
    pub fn new(text: impl Into<String>, bbox: BBox, page_number: usize) -> Self {
        Self {
            text: text.into(),
            bbox,
            page_number,
        }
    }

    /// Whether the token ends in a colon once trailing whitespace is removed.
    pub fn ends_with_colon(&self) -> bool {
        self.text.trim_end().ends_with(':')
    }

    /// Whether the token's box can be used for geometry.
    pub fn has_usable_bbox(&self) -> bool {
        let b = &self.bbox;
        b.x0.is_finite()
            && b.top.is_finite()
            && b.x1.is_finite()
            && b.bottom.is_finite()
            && b.x1 >= b.x0
            && b.bottom >= b.top
    }
}

/// Sort tokens into reading order: top-to-bottom, then left-to-right.
pub fn sort_reading_order(tokens: &mut [&TextToken]) {
    tokens.sort_by(|a, b| {
        a.bbox
            .top
            .total_cmp(&b.bbox.top)
            .then_with(|| a.bbox.x0.total_cmp(&b.bbox.x0))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tok(text: &str, x0: f64, top: f64) -> TextToken {
        TextToken::new(text, BBox::new(x0, top, x0 + 10.0, top + 10.0), 1)
    }

    #[test]
    fn colon_detection_ignores_trailing_space() {
        assert!(tok("Name:", 0.0, 0.0).ends_with_colon());
        assert!(tok("Name: ", 0.0, 0.0).ends_with_colon());
        assert!(!tok("Name", 0.0, 0.0).ends_with_colon());
        assert!(!tok("a:b", 0.0, 0.0).ends_with_colon());
    }

    #[test]
    fn inverted_or_nan_bbox_is_unusable() {
        let mut t = tok("x", 0.0, 0.0);
        assert!(t.has_usable_bbox());
        t.bbox.x1 = -5.0;
        assert!(!t.has_usable_bbox());
        t.bbox = BBox::new(f64::NAN, 0.0, 1.0, 1.0);
        assert!(!t.has_usable_bbox());
    }

    #[test]
    fn reading_order_is_top_then_left() {
        let a = tok("second", 50.0, 10.0);
        let b = tok("first", 10.0, 10.0);
        let c = tok("third", 0.0, 30.0);
        let mut refs = vec![&c, &a, &b];
        sort_reading_order(&mut refs);
        let texts: Vec<&str> = refs.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }
}
