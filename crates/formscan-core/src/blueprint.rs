//! The document-wide field blueprint.
//!
//! A [`Blueprint`] is the interchange format handed to widget writers:
//! `{"form_fields": [{field_name, field_type, is_required, page_number,
//! coordinates: [{x, y} x 4]}]}` with coordinates normalised to the page.

use std::fmt;

use tracing::{info, warn};

use crate::error::{AnalysisError, AnalysisResult, AnalysisWarning, WarningCode};
use crate::geometry::{BBox, PageSize, Point};
use crate::label::UniqueNamer;
use crate::merge::FieldSource;
use crate::pipeline::PageFields;

/// Kind of widget a field should become.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum FieldType {
    /// Free text input (`/FT /Tx`).
    #[default]
    Text,
    /// Check box (`/FT /Btn`).
    Checkbox,
    /// Drop-down or list (`/FT /Ch`).
    Choice,
}

impl FieldType {
    /// The PDF `/FT` name for this field type.
    pub fn as_pdf_name(&self) -> &'static str {
        match self {
            FieldType::Text => "Tx",
            FieldType::Checkbox => "Btn",
            FieldType::Choice => "Ch",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Text => write!(f, "text"),
            FieldType::Checkbox => write!(f, "checkbox"),
            FieldType::Choice => write!(f, "choice"),
        }
    }
}

/// One blueprint entry.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FormField {
    /// Unique sanitised identifier.
    pub field_name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub field_type: FieldType,
    #[cfg_attr(feature = "serde", serde(default))]
    pub is_required: bool,
    /// 1-based page number.
    pub page_number: usize,
    /// Normalised polygon: top-left, top-right, bottom-right, bottom-left.
    pub coordinates: Vec<Point>,
    /// Label text the identifier was derived from.
    #[cfg_attr(feature = "serde", serde(default))]
    pub label: String,
    /// Detector that produced the region, when known.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub source: Option<FieldSource>,
}

impl FormField {
    /// The field rectangle in points on a page of the given size.
    ///
    /// Returns `None` when the polygon has no vertices. Must be given the
    /// same page dimensions the blueprint was normalised with.
    pub fn page_rect(&self, width: f64, height: f64) -> Option<BBox> {
        BBox::from_vertices(&self.coordinates)
            .map(|b| b.denormalize(PageSize::new(width, height)))
    }
}

/// Ordered list of detected fields for a document.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Blueprint {
    pub form_fields: Vec<FormField>,
}

impl Blueprint {
    pub fn len(&self) -> usize {
        self.form_fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.form_fields.is_empty()
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.form_fields
            .iter()
            .map(|f| f.field_name.as_str())
            .collect()
    }

    /// Fields on the given 1-based page.
    pub fn fields_on_page(&self, page_number: usize) -> impl Iterator<Item = &FormField> {
        self.form_fields
            .iter()
            .filter(move |f| f.page_number == page_number)
    }

    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Pretty-printed JSON.
    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Builds a [`Blueprint`] from per-page results, page by page.
///
/// Identifiers are made unique across the whole document in the order pages
/// are added; callers that analyse pages out of order must sort first.
#[derive(Debug)]
pub struct BlueprintAssembler {
    namer: UniqueNamer,
    fields: Vec<FormField>,
    warnings: Vec<AnalysisWarning>,
}

impl BlueprintAssembler {
    pub fn new(max_name_len: usize) -> Self {
        Self {
            namer: UniqueNamer::new(max_name_len),
            fields: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Append the fields of one page.
    ///
    /// Regions are clipped to the page before normalisation, so padding
    /// that spills past an edge never yields coordinates outside `[0, 1]`.
    pub fn add_page(&mut self, page: &PageFields) {
        for labeled in &page.fields {
            let region = &labeled.region;
            let clipped = region.bbox.clip_to(page.page_size);
            let normalized = clipped.normalize(page.page_size);
            if clipped.is_degenerate() || normalized.is_degenerate() {
                warn!(page = page.page_number, bbox = ?region.bbox, "skipping degenerate region");
                self.warnings.push(AnalysisWarning::on_page(
                    WarningCode::DegenerateRect,
                    format!("region for '{}' has no area", labeled.label),
                    page.page_number,
                ));
                continue;
            }
            self.fields.push(FormField {
                field_name: self.namer.assign(&labeled.label),
                field_type: FieldType::Text,
                is_required: false,
                page_number: page.page_number,
                coordinates: normalized.vertices().to_vec(),
                label: labeled.label.clone(),
                source: Some(region.source),
            });
        }
    }

    /// Record a warning raised while producing a page.
    pub fn add_warnings(&mut self, warnings: impl IntoIterator<Item = AnalysisWarning>) {
        self.warnings.extend(warnings);
    }

    /// Number of fields accepted so far.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Finish the document.
    ///
    /// # Errors
    ///
    /// [`AnalysisError::NoFieldsFound`] if no page contributed a field.
    pub fn finish(self) -> Result<AnalysisResult<Blueprint>, AnalysisError> {
        if self.fields.is_empty() {
            return Err(AnalysisError::NoFieldsFound);
        }
        info!(
            fields = self.fields.len(),
            warnings = self.warnings.len(),
            "blueprint assembled"
        );
        Ok(AnalysisResult::with_warnings(
            Blueprint {
                form_fields: self.fields,
            },
            self.warnings,
        ))
    }
}
