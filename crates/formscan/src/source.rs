//! The page-rendering and text-extraction collaborator.

use formscan_core::{PageSize, Raster, TextToken};
use thiserror::Error;

/// Failure reported by a [`PageSource`].
#[derive(Debug, Error)]
pub enum SourceError {
    /// The requested page does not exist.
    #[error("page index {index} out of range (document has {count} pages)")]
    PageOutOfRange { index: usize, count: usize },
    /// Reading page data from disk failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Any other collaborator failure.
    #[error("{0}")]
    Other(String),
}

/// Supplies page geometry, word tokens and rasters for one document.
///
/// Page indices are 0-based. Implementations used with
/// `FormAnalyzer::analyze_parallel` must be `Sync`.
pub trait PageSource {
    /// Number of pages in the document.
    fn page_count(&self) -> usize;

    /// Page dimensions in PDF points.
    fn page_size(&self, index: usize) -> Result<PageSize, SourceError>;

    /// Word-level tokens with boxes in PDF points (top-left origin).
    fn tokens(&self, index: usize) -> Result<Vec<TextToken>, SourceError>;

    /// A grayscale rendering of the page.
    ///
    /// `dpi` is the requested resolution; a source may answer with its own
    /// native resolution, recorded in [`Raster::dpi`]. `Ok(None)` means the
    /// page has no raster and line detection is skipped.
    fn render(&self, index: usize, dpi: f64) -> Result<Option<Raster>, SourceError>;

    /// Whether the page embeds images. Only pages without images are
    /// eligible for the sparse-page skip. Defaults to `false`.
    fn has_images(&self, index: usize) -> Result<bool, SourceError> {
        let _ = index;
        Ok(false)
    }
}

impl<T: PageSource + ?Sized> PageSource for &T {
    fn page_count(&self) -> usize {
        (**self).page_count()
    }

    fn page_size(&self, index: usize) -> Result<PageSize, SourceError> {
        (**self).page_size(index)
    }

    fn tokens(&self, index: usize) -> Result<Vec<TextToken>, SourceError> {
        (**self).tokens(index)
    }

    fn render(&self, index: usize, dpi: f64) -> Result<Option<Raster>, SourceError> {
        (**self).render(index, dpi)
    }

    fn has_images(&self, index: usize) -> Result<bool, SourceError> {
        (**self).has_images(index)
    }
}
