//! formscan: find fillable regions on flat PDF pages and emit a form-field
//! blueprint.
//!
//! This is the public facade. It re-exports the data types and algorithms
//! of `formscan-core` and adds the document-level pieces around them.
//!
//! # Architecture
//!
//! - **formscan-core**: geometry, Hough line detection, text scanning,
//!   merging, labelling and blueprint assembly for a single page
//! - **formscan** (this crate): the [`PageSource`] collaborator trait, an
//!   in-memory document model, [`FormAnalyzer`] for whole documents, JSON
//!   error reports, and (feature `write`) lopdf-backed blueprint consumers
//!
//! # Example
//!
//! ```ignore
//! let doc = MemoryDocument::from_manifest_text_only(Manifest::from_json(&json)?);
//! match FormAnalyzer::default().analyze(&doc) {
//!     Ok(result) => println!("{}", result.value.to_json()?),
//!     Err(e) => println!("{}", ErrorReport::from(&e).to_json()),
//! }
//! ```

mod analyzer;
mod memory;
mod report;
mod source;
#[cfg(feature = "write")]
pub mod write;

pub use analyzer::FormAnalyzer;
pub use formscan_core;
pub use formscan_core::{
    AnalysisError, AnalysisResult, AnalysisWarning, BBox, Blueprint, FieldSource, FieldType,
    FormField, GrayImage, HeuristicSettings, LabelSettings, LineDetectorSettings, Luma, MergeSettings,
    PageFields, PageSize, Point, Raster, TextScanSettings, TextToken, UnderscorePolicy,
    WarningCode,
};
pub use memory::{Manifest, ManifestPage, ManifestToken, MemoryDocument, MemoryPage, RasterRef};
pub use report::ErrorReport;
pub use source::{PageSource, SourceError};
