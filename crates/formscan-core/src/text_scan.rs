//! Text-pattern field candidates: underscore runs and colon labels.

use std::fmt;
use std::str::FromStr;

use tracing::warn;

use crate::error::{AnalysisResult, AnalysisWarning, WarningCode};
use crate::geometry::BBox;
use crate::token::TextToken;

/// Gap between a colon label and the field synthesised after it, in points.
const COLON_FIELD_GAP: f64 = 10.0;
/// Distance kept from the right page edge by a synthesised field, in points.
const COLON_FIELD_RIGHT_MARGIN: f64 = 50.0;
/// Vertical padding of a synthesised field around its label, in points.
const COLON_FIELD_PAD: f64 = 5.0;

/// Which tokens count as underscore fill-in blanks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "kind", rename_all = "snake_case")
)]
pub enum UnderscorePolicy {
    /// Every character is an underscore and there are more than `min_len`.
    Strict { min_len: usize },
    /// The token contains a run of at least `min_len` underscores.
    Run { min_len: usize },
    /// The token contains any underscore.
    Any,
}

impl Default for UnderscorePolicy {
    fn default() -> Self {
        UnderscorePolicy::Run { min_len: 3 }
    }
}

impl UnderscorePolicy {
    pub fn matches(&self, text: &str) -> bool {
        match *self {
            UnderscorePolicy::Strict { min_len } => {
                let count = text.chars().count();
                count > min_len && text.chars().all(|c| c == '_')
            }
            UnderscorePolicy::Run { min_len } => longest_underscore_run(text) >= min_len.max(1),
            UnderscorePolicy::Any => text.contains('_'),
        }
    }
}

fn longest_underscore_run(text: &str) -> usize {
    let mut best = 0;
    let mut cur = 0;
    for c in text.chars() {
        if c == '_' {
            cur += 1;
            best = best.max(cur);
        } else {
            cur = 0;
        }
    }
    best
}

impl fmt::Display for UnderscorePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnderscorePolicy::Strict { min_len } => write!(f, "strict:{min_len}"),
            UnderscorePolicy::Run { min_len } => write!(f, "run:{min_len}"),
            UnderscorePolicy::Any => f.write_str("any"),
        }
    }
}

impl FromStr for UnderscorePolicy {
    type Err = String;

    /// Parse `any`, `run`, `run:N`, `strict` or `strict:N`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, len) = match s.split_once(':') {
            Some((kind, len)) => {
                let n = len
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| format!("invalid underscore length: '{len}'"))?;
                (kind.trim(), Some(n))
            }
            None => (s.trim(), None),
        };
        match (kind.to_ascii_lowercase().as_str(), len) {
            ("any", None) => Ok(UnderscorePolicy::Any),
            ("run", n) => Ok(UnderscorePolicy::Run {
                min_len: n.unwrap_or(3),
            }),
            ("strict", n) => Ok(UnderscorePolicy::Strict {
                min_len: n.unwrap_or(3),
            }),
            _ => Err(format!(
                "invalid underscore policy '{s}': expected any, run[:N] or strict[:N]"
            )),
        }
    }
}

/// Text-scanner tunables.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TextScanSettings {
    pub underscore_policy: UnderscorePolicy,
    /// Also synthesise a field to the right of every colon label.
    pub colon_label_fields: bool,
}

/// Whether a token is an underscore blank under `policy`.
pub fn is_fill_token(token: &TextToken, policy: &UnderscorePolicy) -> bool {
    policy.matches(&token.text)
}

/// Whether a token reads as a label such as `"Name:"`.
pub fn is_colon_label(token: &TextToken) -> bool {
    token.ends_with_colon() && token.text.trim().len() > 1
}

fn usable(token: &TextToken, page_number: usize, warnings: &mut Vec<AnalysisWarning>) -> bool {
    if token.has_usable_bbox() {
        return true;
    }
    warn!(page = page_number, text = %token.text, "skipping token with unusable bbox");
    warnings.push(AnalysisWarning::on_page(
        WarningCode::MalformedToken,
        format!("token '{}' has an unusable bounding box", token.text),
        page_number,
    ));
    false
}

/// Rectangles of every underscore token on a page, in token order.
pub fn scan_underscore_fields(
    tokens: &[TextToken],
    policy: &UnderscorePolicy,
    page_number: usize,
) -> AnalysisResult<Vec<BBox>> {
    let mut warnings = Vec::new();
    let rects = tokens
        .iter()
        .filter(|t| is_fill_token(t, policy))
        .filter(|t| usable(t, page_number, &mut warnings))
        .map(|t| t.bbox)
        .collect();
    AnalysisResult::with_warnings(rects, warnings)
}

/// Synthesise a field rectangle to the right of each colon label.
///
/// Labels containing any of `excluded_terms` (case-insensitive) are skipped,
/// as are labels too close to the right edge to leave room for a field.
pub fn colon_label_fields(
    tokens: &[TextToken],
    page_width: f64,
    excluded_terms: &[String],
    page_number: usize,
) -> AnalysisResult<Vec<BBox>> {
    let mut warnings = Vec::new();
    let mut rects = Vec::new();
    for token in tokens.iter().filter(|t| is_colon_label(t)) {
        if contains_excluded(&token.text, excluded_terms) {
            continue;
        }
        if !usable(token, page_number, &mut warnings) {
            continue;
        }
        let x0 = token.bbox.x1 + COLON_FIELD_GAP;
        let x1 = page_width - COLON_FIELD_RIGHT_MARGIN;
        if x1 <= x0 {
            continue;
        }
        rects.push(BBox::new(
            x0,
            token.bbox.top - COLON_FIELD_PAD,
            x1,
            token.bbox.bottom + COLON_FIELD_PAD,
        ));
    }
    AnalysisResult::with_warnings(rects, warnings)
}

/// Case-insensitive substring test against a list of excluded terms.
pub fn contains_excluded(text: &str, excluded_terms: &[String]) -> bool {
    let lower = text.to_lowercase();
    excluded_terms
        .iter()
        .any(|term| !term.is_empty() && lower.contains(&term.to_lowercase()))
}
