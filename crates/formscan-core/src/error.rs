//! Error and warning types for form-field analysis.
//!
//! Provides [`AnalysisError`] for outcomes that end a document analysis,
//! [`AnalysisWarning`] for per-page geometry problems that are skipped, and
//! [`AnalysisResult`] for pairing a value with the warnings collected while
//! producing it.

use std::fmt;

use thiserror::Error;

/// Document-level failure.
///
/// Callers branch on the variant: [`AnalysisError::NoFieldsFound`] is the
/// signal to try an alternate field source, configuration errors must not be
/// retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    /// Missing or unusable configuration (credentials, settings file).
    #[error("configuration error: {0}")]
    Configuration(String),
    /// A heuristic setting is out of its valid range.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
    /// Every page was processed and none yielded a field.
    #[error("no form fields were found using local heuristics")]
    NoFieldsFound,
    /// The page rendering / text extraction collaborator failed.
    #[error("page {page}: {message}")]
    PageSource {
        /// 1-based page number.
        page: usize,
        message: String,
    },
    /// Unexpected failure inside the pipeline, e.g. a panic during raster
    /// processing.
    #[error("{kind} - {message}")]
    Internal { kind: String, message: String },
}

impl AnalysisError {
    /// Whether an alternate field source is worth trying after this error.
    pub fn allows_fallback(&self) -> bool {
        !matches!(
            self,
            AnalysisError::Configuration(_) | AnalysisError::InvalidSettings(_)
        )
    }
}

/// Machine-readable warning code.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "type", content = "detail")
)]
pub enum WarningCode {
    /// A candidate rectangle had zero area or non-finite coordinates.
    DegenerateRect,
    /// A line segment could not be mapped into page space.
    MalformedSegment,
    /// A text token had an unusable bounding box.
    MalformedToken,
    /// The page was skipped before detection (sparse or invalid size).
    PageSkipped,
    /// Any other warning not covered by specific variants.
    Other(String),
}

impl WarningCode {
    /// Returns the string tag for this warning code.
    pub fn as_str(&self) -> &str {
        match self {
            WarningCode::DegenerateRect => "DEGENERATE_RECT",
            WarningCode::MalformedSegment => "MALFORMED_SEGMENT",
            WarningCode::MalformedToken => "MALFORMED_TOKEN",
            WarningCode::PageSkipped => "PAGE_SKIPPED",
            WarningCode::Other(_) => "OTHER",
        }
    }
}

impl fmt::Display for WarningCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-fatal problem; the offending candidate is skipped and processing
/// continues.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnalysisWarning {
    pub code: WarningCode,
    pub description: String,
    /// 1-based page number, if applicable.
    pub page: Option<usize>,
}

impl AnalysisWarning {
    pub fn new(code: WarningCode, description: impl Into<String>) -> Self {
        Self {
            code,
            description: description.into(),
            page: None,
        }
    }

    pub fn on_page(code: WarningCode, description: impl Into<String>, page: usize) -> Self {
        Self {
            code,
            description: description.into(),
            page: Some(page),
        }
    }
}

impl fmt::Display for AnalysisWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.description)?;
        if let Some(page) = self.page {
            write!(f, " (page {page})")?;
        }
        Ok(())
    }
}

/// Result wrapper that pairs a value with collected warnings.
#[derive(Debug, Clone)]
pub struct AnalysisResult<T> {
    pub value: T,
    pub warnings: Vec<AnalysisWarning>,
}

impl<T> AnalysisResult<T> {
    /// Create a result with no warnings.
    pub fn ok(value: T) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(value: T, warnings: Vec<AnalysisWarning>) -> Self {
        Self { value, warnings }
    }

    /// Returns true if there are no warnings.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Transform the value while preserving warnings.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> AnalysisResult<U> {
        AnalysisResult {
            value: f(self.value),
            warnings: self.warnings,
        }
    }
}
