//! Document-level analysis over a [`PageSource`].

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

use formscan_core::{
    AnalysisError, AnalysisResult, Blueprint, BlueprintAssembler, HeuristicSettings, PageFields,
    PageInput, analyze_page,
};
use tracing::{debug, info};

use crate::source::PageSource;

/// Runs the heuristic field detector over whole documents.
#[derive(Debug, Clone, Default)]
pub struct FormAnalyzer {
    settings: HeuristicSettings,
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

impl FormAnalyzer {
    /// Create an analyzer after validating `settings`.
    ///
    /// # Errors
    ///
    /// [`AnalysisError::InvalidSettings`] if a setting is out of range.
    pub fn new(settings: HeuristicSettings) -> Result<Self, AnalysisError> {
        settings.validate()?;
        Ok(Self { settings })
    }

    pub fn settings(&self) -> &HeuristicSettings {
        &self.settings
    }

    /// Analyse one page (0-based `index`).
    ///
    /// Collaborator failures become [`AnalysisError::PageSource`]; a panic
    /// anywhere in the page pass becomes [`AnalysisError::Internal`] with
    /// kind `"panic"`.
    pub fn analyze_page<S>(&self, source: &S, index: usize) -> Result<AnalysisResult<PageFields>, AnalysisError>
    where
        S: PageSource + ?Sized,
    {
        let page_number = index + 1;
        let outcome = catch_unwind(AssertUnwindSafe(|| -> Result<_, AnalysisError> {
            let source_err = |e: crate::source::SourceError| AnalysisError::PageSource {
                page: page_number,
                message: e.to_string(),
            };
            let size = source.page_size(index).map_err(source_err)?;
            let tokens = source.tokens(index).map_err(source_err)?;
            let raster = source.render(index, self.settings.dpi).map_err(source_err)?;
            let has_images = source.has_images(index).map_err(source_err)?;
            let input = PageInput {
                page_number,
                size,
                tokens: &tokens,
                raster: raster.as_ref(),
                has_images,
            };
            Ok(analyze_page(&input, &self.settings))
        }));
        match outcome {
            Ok(result) => result,
            Err(payload) => Err(AnalysisError::Internal {
                kind: "panic".to_string(),
                message: panic_message(payload),
            }),
        }
    }

    /// Analyse every page in order and assemble the blueprint.
    ///
    /// # Errors
    ///
    /// [`AnalysisError::NoFieldsFound`] when no page yields a field, or the
    /// first page-level failure.
    pub fn analyze<S>(&self, source: &S) -> Result<AnalysisResult<Blueprint>, AnalysisError>
    where
        S: PageSource + ?Sized,
    {
        let indices: Vec<usize> = (0..source.page_count()).collect();
        self.analyze_pages(source, &indices)
    }

    /// Analyse the given 0-based pages, in the order given.
    pub fn analyze_pages<S>(&self, source: &S, indices: &[usize]) -> Result<AnalysisResult<Blueprint>, AnalysisError>
    where
        S: PageSource + ?Sized,
    {
        debug!(pages = indices.len(), "analyzing document");
        let mut pages = Vec::with_capacity(indices.len());
        for &index in indices {
            pages.push(self.analyze_page(source, index)?);
        }
        self.assemble(pages)
    }

    /// Analyse pages concurrently with rayon.
    ///
    /// Results are gathered in page order before assembly, so the blueprint
    /// (including name suffixes) and the reported error equal those from
    /// [`FormAnalyzer::analyze`].
    #[cfg(feature = "parallel")]
    pub fn analyze_parallel<S>(&self, source: &S) -> Result<AnalysisResult<Blueprint>, AnalysisError>
    where
        S: PageSource + Sync + ?Sized,
    {
        let indices: Vec<usize> = (0..source.page_count()).collect();
        self.analyze_pages_parallel(source, &indices)
    }

    /// Parallel counterpart of [`FormAnalyzer::analyze_pages`].
    ///
    /// Every page runs to completion; if several fail, the error of the
    /// earliest one in `indices` is returned.
    #[cfg(feature = "parallel")]
    pub fn analyze_pages_parallel<S>(
        &self,
        source: &S,
        indices: &[usize],
    ) -> Result<AnalysisResult<Blueprint>, AnalysisError>
    where
        S: PageSource + Sync + ?Sized,
    {
        use rayon::prelude::*;

        debug!(pages = indices.len(), "analyzing document in parallel");
        let results: Vec<_> = indices
            .par_iter()
            .map(|&i| self.analyze_page(source, i))
            .collect();
        let pages = results.into_iter().collect::<Result<Vec<_>, _>>()?;
        self.assemble(pages)
    }

    fn assemble(&self, pages: Vec<AnalysisResult<PageFields>>) -> Result<AnalysisResult<Blueprint>, AnalysisError> {
        let page_count = pages.len();
        let mut assembler = BlueprintAssembler::new(self.settings.label.max_name_len);
        for page in pages {
            assembler.add_page(&page.value);
            assembler.add_warnings(page.warnings);
        }
        info!(pages = page_count, fields = assembler.len(), "document analyzed");
        assembler.finish()
    }
}
