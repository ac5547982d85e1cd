//! Structured error output for callers that speak JSON.

use formscan_core::AnalysisError;
use serde::{Deserialize, Serialize};

/// `{"error": "<message>", "diagnostics": [...]}`.
///
/// `diagnostics` carries auxiliary paths (debug renders, manifests) and is
/// omitted when empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub error: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<String>,
}

impl ErrorReport {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            diagnostics: Vec::new(),
        }
    }

    pub fn with_diagnostic(mut self, path: impl Into<String>) -> Self {
        self.diagnostics.push(path.into());
        self
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| format!("{{\"error\": {:?}}}", self.error))
    }
}

impl From<&AnalysisError> for ErrorReport {
    fn from(err: &AnalysisError) -> Self {
        let message = match err {
            AnalysisError::Internal { .. } => format!("an error occurred in local heuristics: {err}"),
            _ => err.to_string(),
        };
        ErrorReport::new(message)
    }
}

impl From<AnalysisError> for ErrorReport {
    fn from(err: AnalysisError) -> Self {
        ErrorReport::from(&err)
    }
}
