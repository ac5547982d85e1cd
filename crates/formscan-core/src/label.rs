//! Naming field regions from nearby text.
//!
//! A label is read from a context window to the left of the region. The
//! resulting human-readable text is later turned into a unique identifier by
//! [`UniqueNamer`].

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::geometry::BBox;
use crate::merge::FieldRegion;
use crate::text_scan::{UnderscorePolicy, contains_excluded, is_colon_label, is_fill_token};
use crate::token::{TextToken, sort_reading_order};

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));
static NON_IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9_]").expect("valid identifier pattern"));
static UNDERSCORE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_{2,}").expect("valid underscore pattern"));

/// Identifier used when sanitisation leaves nothing.
pub const FALLBACK_IDENTIFIER: &str = "field";

/// Label-association tunables, in PDF points.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LabelSettings {
    /// How far left of the region the context window reaches.
    pub context_width: f64,
    /// Gap between the context window and the region.
    pub margin: f64,
    /// Padding above and below the region.
    pub vertical_pad: f64,
    /// Maximum identifier length, numeric suffix included.
    pub max_name_len: usize,
    /// Regions whose label contains any of these (case-insensitive) are dropped.
    pub excluded_terms: Vec<String>,
}

impl Default for LabelSettings {
    fn default() -> Self {
        Self {
            context_width: 200.0,
            margin: 5.0,
            vertical_pad: 5.0,
            max_name_len: 50,
            excluded_terms: vec!["signature".to_string()],
        }
    }
}

/// Outcome of label association for one region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelOutcome {
    /// Label text read from the context window.
    Named(String),
    /// No context text; a placeholder was synthesised.
    Fallback(String),
    /// The label hit an excluded term; the region must not be emitted.
    Excluded(String),
}

impl LabelOutcome {
    /// The label text, unless the region was excluded.
    pub fn label(&self) -> Option<&str> {
        match self {
            LabelOutcome::Named(s) | LabelOutcome::Fallback(s) => Some(s),
            LabelOutcome::Excluded(_) => None,
        }
    }
}

/// The window to the left of `region` searched for label text.
pub fn context_rect(region: &BBox, settings: &LabelSettings) -> BBox {
    BBox::new(
        region.x0 - settings.context_width,
        region.top - settings.vertical_pad,
        region.x0 - settings.margin,
        region.bottom + settings.vertical_pad,
    )
}

/// Collapse whitespace runs to single spaces and strip surrounding colons
/// and whitespace.
pub fn clean_label_text(raw: &str) -> String {
    let collapsed = WHITESPACE_RUN.replace_all(raw, " ");
    collapsed
        .trim_matches(|c: char| c == ':' || c.is_whitespace())
        .to_string()
}

/// Placeholder label for a region with no readable context.
pub fn fallback_label(page_number: usize, region: &BBox) -> String {
    format!("Unnamed Field {}-{}", page_number, region.x0 as i64)
}

/// Pick label tokens out of the context window's reading-ordered tokens.
///
/// With colon labels present, the label runs from just after the
/// second-to-last colon label through the last one, so a window holding
/// `"Phone: Fax:"` yields `"Fax:"`.
fn label_tokens<'a, 'b>(tokens: &'b [&'a TextToken]) -> &'b [&'a TextToken] {
    let colons: Vec<usize> = tokens
        .iter()
        .enumerate()
        .filter(|(_, t)| is_colon_label(t))
        .map(|(i, _)| i)
        .collect();
    match colons.as_slice() {
        [] => tokens,
        [only] => &tokens[..=*only],
        [.., prev, last] => &tokens[prev + 1..=*last],
    }
}

/// Read the label for `region` from `tokens` (all tokens of its page).
///
/// Underscore blanks are never label text. The result is
/// [`LabelOutcome::Excluded`] when the label mentions an excluded term.
pub fn associate_label(
    region: &FieldRegion,
    tokens: &[TextToken],
    policy: &UnderscorePolicy,
    settings: &LabelSettings,
) -> LabelOutcome {
    let window = context_rect(&region.bbox, settings);
    let mut context: Vec<&TextToken> = tokens
        .iter()
        .filter(|t| t.has_usable_bbox())
        .filter(|t| !is_fill_token(t, policy))
        .filter(|t| window.intersects(&t.bbox))
        .collect();
    sort_reading_order(&mut context);

    let joined = label_tokens(&context)
        .iter()
        .map(|t| t.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let label = clean_label_text(&joined);

    if label.is_empty() {
        return LabelOutcome::Fallback(fallback_label(region.page_number, &region.bbox));
    }
    if contains_excluded(&label, &settings.excluded_terms) {
        return LabelOutcome::Excluded(label);
    }
    LabelOutcome::Named(label)
}

/// Turn a label into an identifier: lowercase, whitespace to `_`, only
/// `[a-z0-9_]`, no repeated or surrounding underscores, at most `max_len`
/// characters, never empty.
pub fn sanitize_field_name(label: &str, max_len: usize) -> String {
    let lower = label.to_lowercase();
    let underscored = WHITESPACE_RUN.replace_all(lower.trim(), "_");
    let stripped = NON_IDENTIFIER.replace_all(&underscored, "");
    let collapsed = UNDERSCORE_RUN.replace_all(&stripped, "_");
    let mut name = collapsed.trim_matches('_').to_string();
    name.truncate(max_len);
    let name = name.trim_end_matches('_');
    if name.is_empty() {
        let mut fallback = FALLBACK_IDENTIFIER.to_string();
        fallback.truncate(max_len.max(1));
        return fallback;
    }
    name.to_string()
}

/// Hands out sanitised identifiers, suffixing collisions with `_1`, `_2`, ...
#[derive(Debug, Clone)]
pub struct UniqueNamer {
    max_len: usize,
    taken: HashSet<String>,
}

impl UniqueNamer {
    pub fn new(max_len: usize) -> Self {
        Self {
            max_len,
            taken: HashSet::new(),
        }
    }

    /// Sanitise `label` and make it unique among names handed out so far.
    pub fn assign(&mut self, label: &str) -> String {
        let base = sanitize_field_name(label, self.max_len);
        if self.taken.insert(base.clone()) {
            return base;
        }
        let mut n = 1usize;
        loop {
            let suffix = format!("_{n}");
            let room = self.max_len.saturating_sub(suffix.len()).max(1);
            let mut stem = base.clone();
            stem.truncate(room);
            let candidate = format!("{}{suffix}", stem.trim_end_matches('_'));
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.taken.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taken.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::FieldSource;

    fn tok(text: &str, x0: f64, top: f64, x1: f64, bottom: f64) -> TextToken {
        TextToken::new(text, BBox::new(x0, top, x1, bottom), 1)
    }

    fn region(x0: f64, top: f64, x1: f64, bottom: f64) -> FieldRegion {
        FieldRegion {
            bbox: BBox::new(x0, top, x1, bottom),
            page_number: 1,
            source: FieldSource::Underscore,
        }
    }

    fn label_of(region: &FieldRegion, tokens: &[TextToken]) -> LabelOutcome {
        associate_label(
            region,
            tokens,
            &UnderscorePolicy::default(),
            &LabelSettings::default(),
        )
    }

    #[test]
    fn context_window_sits_left_of_region() {
        let rect = context_rect(&BBox::new(145.0, 100.0, 300.0, 110.0), &LabelSettings::default());
        assert_eq!(rect, BBox::new(-55.0, 95.0, 140.0, 115.0));
    }

    #[test]
    fn touching_label_is_found() {
        let tokens = vec![
            tok("Name:", 100.0, 100.0, 140.0, 110.0),
            tok("______", 145.0, 100.0, 300.0, 110.0),
        ];
        let outcome = label_of(&region(145.0, 100.0, 300.0, 110.0), &tokens);
        assert_eq!(outcome, LabelOutcome::Named("Name".to_string()));
    }

    #[test]
    fn multi_word_label_in_reading_order() {
        let tokens = vec![
            tok("Name:", 130.0, 100.0, 170.0, 110.0),
            tok("Company", 60.0, 100.0, 125.0, 110.0),
        ];
        let outcome = label_of(&region(180.0, 100.0, 400.0, 110.0), &tokens);
        assert_eq!(outcome, LabelOutcome::Named("Company Name".to_string()));
    }

    #[test]
    fn two_line_label_joined_top_first() {
        let tokens = vec![
            tok("Address", 100.0, 104.0, 150.0, 112.0),
            tok("Mailing", 100.0, 94.0, 150.0, 102.0),
        ];
        let outcome = label_of(&region(160.0, 100.0, 400.0, 110.0), &tokens);
        assert_eq!(outcome, LabelOutcome::Named("Mailing Address".to_string()));
    }

    #[test]
    fn colon_labels_split_shared_row() {
        let tokens = vec![
            tok("Phone:", 40.0, 100.0, 80.0, 110.0),
            tok("_____", 85.0, 100.0, 180.0, 110.0),
            tok("Fax:", 185.0, 100.0, 210.0, 110.0),
        ];
        let fax = label_of(&region(215.0, 100.0, 330.0, 110.0), &tokens);
        assert_eq!(fax, LabelOutcome::Named("Fax".to_string()));
        let phone = label_of(&region(85.0, 100.0, 180.0, 110.0), &tokens);
        assert_eq!(phone, LabelOutcome::Named("Phone".to_string()));
    }

    #[test]
    fn empty_context_falls_back() {
        let outcome = label_of(&region(145.7, 100.0, 300.0, 110.0), &[]);
        assert_eq!(
            outcome,
            LabelOutcome::Fallback("Unnamed Field 1-145".to_string())
        );
    }

    #[test]
    fn signature_labels_are_excluded_any_case() {
        let tokens = vec![tok("Authorized SIGNATURE:", 20.0, 100.0, 140.0, 110.0)];
        let outcome = label_of(&region(145.0, 100.0, 300.0, 110.0), &tokens);
        assert!(matches!(outcome, LabelOutcome::Excluded(_)));
        assert_eq!(outcome.label(), None);
    }

    #[test]
    fn clean_collapses_newlines_and_colons() {
        assert_eq!(clean_label_text("  :Name:\n "), "Name");
        assert_eq!(clean_label_text("Mailing\n   Address:"), "Mailing Address");
        assert_eq!(clean_label_text(" : "), "");
    }

    #[test]
    fn sanitize_rules() {
        assert_eq!(sanitize_field_name("Company Name", 50), "company_name");
        assert_eq!(sanitize_field_name("Company  Name", 50), "company_name");
        assert_eq!(sanitize_field_name("E-mail (work)", 50), "email_work");
        assert_eq!(sanitize_field_name("Unnamed Field 1-145", 50), "unnamed_field_1145");
        assert_eq!(sanitize_field_name("a __ b", 50), "a_b");
        assert_eq!(sanitize_field_name("***", 50), "field");
        assert_eq!(sanitize_field_name("abcdef ghi", 7), "abcdef");
        assert_eq!(sanitize_field_name(&"x".repeat(80), 50).len(), 50);
    }

    #[test]
    fn namer_suffixes_collisions() {
        let mut namer = UniqueNamer::new(50);
        assert_eq!(namer.assign("Company Name"), "company_name");
        assert_eq!(namer.assign("Company  Name"), "company_name_1");
        assert_eq!(namer.assign("company name"), "company_name_2");
        assert_eq!(namer.assign("Company Name 1"), "company_name_1_1");
        assert_eq!(namer.len(), 4);
    }

    #[test]
    fn namer_keeps_suffixed_names_within_limit() {
        let mut namer = UniqueNamer::new(10);
        let long = "abcdefghijklmnop";
        assert_eq!(namer.assign(long), "abcdefghij");
        let second = namer.assign(long);
        assert_eq!(second, "abcdefgh_1");
        assert!(second.len() <= 10);
    }
}
