//! An in-memory [`PageSource`] and its JSON manifest format.
//!
//! A manifest describes a document page by page:
//!
//! ```json
//! {"pages": [{
//!     "width": 612, "height": 792,
//!     "tokens": [{"text": "Name:", "x0": 100, "top": 100, "x1": 140, "bottom": 110}],
//!     "raster": {"path": "page1.png", "dpi": 300},
//!     "images": true
//! }]}
//! ```
//!
//! Raster paths are resolved by the caller, which owns image decoding.

use std::path::PathBuf;

use formscan_core::{BBox, GrayImage, PageSize, Raster, TextToken};
use serde::{Deserialize, Serialize};

use crate::source::{PageSource, SourceError};

/// Top-level manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub pages: Vec<ManifestPage>,
}

/// One page entry of a [`Manifest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestPage {
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub tokens: Vec<ManifestToken>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raster: Option<RasterRef>,
    /// The page embeds images.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub images: bool,
}

/// A word token as written in a manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestToken {
    pub text: String,
    pub x0: f64,
    pub top: f64,
    pub x1: f64,
    pub bottom: f64,
}

/// Location and resolution of a pre-rendered page image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterRef {
    pub path: PathBuf,
    pub dpi: f64,
}

impl Manifest {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// A page held in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryPage {
    pub size: PageSize,
    pub tokens: Vec<TextToken>,
    pub raster: Option<Raster>,
    pub has_images: bool,
}

impl MemoryPage {
    pub fn new(size: PageSize) -> Self {
        Self {
            size,
            tokens: Vec::new(),
            raster: None,
            has_images: false,
        }
    }

    pub fn with_tokens(mut self, tokens: Vec<TextToken>) -> Self {
        self.tokens = tokens;
        self
    }

    pub fn with_raster(mut self, raster: Raster) -> Self {
        self.raster = Some(raster);
        self
    }

    pub fn with_images(mut self, has_images: bool) -> Self {
        self.has_images = has_images;
        self
    }
}

/// A document whose pages are already extracted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryDocument {
    pages: Vec<MemoryPage>,
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pages(pages: Vec<MemoryPage>) -> Self {
        Self { pages }
    }

    pub fn push_page(&mut self, page: MemoryPage) {
        self.pages.push(page);
    }

    pub fn pages(&self) -> &[MemoryPage] {
        &self.pages
    }

    /// Build a document from a manifest, loading each referenced raster
    /// through `load_raster`.
    ///
    /// # Errors
    ///
    /// The first error returned by `load_raster`.
    pub fn from_manifest<F>(manifest: Manifest, mut load_raster: F) -> Result<Self, SourceError>
    where
        F: FnMut(&RasterRef) -> Result<GrayImage, SourceError>,
    {
        let mut pages = Vec::with_capacity(manifest.pages.len());
        for (i, page) in manifest.pages.into_iter().enumerate() {
            let raster = match &page.raster {
                Some(r) => Some(Raster::new(load_raster(r)?, r.dpi)),
                None => None,
            };
            pages.push(MemoryPage {
                size: PageSize::new(page.width, page.height),
                tokens: convert_tokens(page.tokens, i + 1),
                raster,
                has_images: page.images,
            });
        }
        Ok(Self { pages })
    }

    /// Build a document from a manifest, ignoring any raster references.
    pub fn from_manifest_text_only(manifest: Manifest) -> Self {
        let pages = manifest
            .pages
            .into_iter()
            .enumerate()
            .map(|(i, page)| MemoryPage {
                size: PageSize::new(page.width, page.height),
                tokens: convert_tokens(page.tokens, i + 1),
                raster: None,
                has_images: page.images,
            })
            .collect();
        Self { pages }
    }

    fn page(&self, index: usize) -> Result<&MemoryPage, SourceError> {
        self.pages.get(index).ok_or(SourceError::PageOutOfRange {
            index,
            count: self.pages.len(),
        })
    }
}

fn convert_tokens(tokens: Vec<ManifestToken>, page_number: usize) -> Vec<TextToken> {
    tokens
        .into_iter()
        .map(|t| TextToken::new(t.text, BBox::new(t.x0, t.top, t.x1, t.bottom), page_number))
        .collect()
}

impl PageSource for MemoryDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_size(&self, index: usize) -> Result<PageSize, SourceError> {
        Ok(self.page(index)?.size)
    }

    fn tokens(&self, index: usize) -> Result<Vec<TextToken>, SourceError> {
        Ok(self.page(index)?.tokens.clone())
    }

    fn render(&self, index: usize, _dpi: f64) -> Result<Option<Raster>, SourceError> {
        Ok(self.page(index)?.raster.clone())
    }

    fn has_images(&self, index: usize) -> Result<bool, SourceError> {
        Ok(self.page(index)?.has_images)
    }
}
