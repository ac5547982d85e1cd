use std::path::Path;

use formscan::{FormAnalyzer, PageSource};
use tracing::info;

use crate::cli::SettingsArgs;
use crate::page_range::PageSelection;
use crate::shared::{load_document, load_settings, report_analysis_error, write_file};

pub fn run(
    manifest: &Path,
    pages: Option<&PageSelection>,
    output: Option<&Path>,
    settings_args: &SettingsArgs,
) -> Result<(), i32> {
    let settings = load_settings(settings_args)?;
    let doc = load_document(manifest)?;

    let indices = match pages {
        Some(selection) => selection.indices(doc.page_count()).map_err(|e| {
            eprintln!("Error: {e}");
            1
        })?,
        None => (0..doc.page_count()).collect(),
    };

    let analyzer = FormAnalyzer::new(settings).map_err(|e| report_analysis_error(&e))?;
    let result = if settings_args.parallel {
        analyzer.analyze_pages_parallel(&doc, &indices)
    } else {
        analyzer.analyze_pages(&doc, &indices)
    }
    .map_err(|e| report_analysis_error(&e))?;

    info!(fields = result.value.len(), warnings = result.warnings.len(), "detection finished");

    let json = result.value.to_json().map_err(|e| {
        eprintln!("Error: failed to serialize blueprint: {e}");
        1
    })?;
    match output {
        Some(path) => write_file(path, json.as_bytes()),
        None => {
            println!("{json}");
            Ok(())
        }
    }
}
