use std::fs;
use std::path::Path;

use formscan::{
    AnalysisError, ErrorReport, GrayImage, HeuristicSettings, Manifest, MemoryDocument, RasterRef,
    SourceError,
};

use crate::cli::SettingsArgs;

/// Exit code when analysis finds nothing, so callers can fall back to
/// another detector.
pub const EXIT_NO_FIELDS: i32 = 2;

/// Read a whole file, reporting a missing or unreadable file on stderr.
pub fn read_file(file: &Path) -> Result<Vec<u8>, i32> {
    if !file.exists() {
        eprintln!("Error: file not found: {}", file.display());
        return Err(1);
    }
    fs::read(file).map_err(|e| {
        eprintln!("Error: failed to read {}: {e}", file.display());
        1
    })
}

pub fn read_text(file: &Path) -> Result<String, i32> {
    let bytes = read_file(file)?;
    String::from_utf8(bytes).map_err(|_| {
        eprintln!("Error: {} is not valid UTF-8", file.display());
        1
    })
}

pub fn write_file(file: &Path, bytes: &[u8]) -> Result<(), i32> {
    fs::write(file, bytes).map_err(|e| {
        eprintln!("Error: failed to write {}: {e}", file.display());
        1
    })
}

/// Defaults, overlaid by the settings file, overlaid by flags.
pub fn load_settings(args: &SettingsArgs) -> Result<HeuristicSettings, i32> {
    let mut settings = match &args.settings {
        Some(path) => serde_json::from_str(&read_text(path)?).map_err(|e| {
            eprintln!("Error: invalid settings file {}: {e}", path.display());
            1
        })?,
        None => HeuristicSettings::default(),
    };

    if let Some(dpi) = args.dpi {
        settings.dpi = dpi;
    }
    if let Some(tolerance) = args.merge_tolerance {
        settings.merge.tolerance = tolerance;
    }
    if let Some(policy) = args.underscore_policy {
        settings.text.underscore_policy = policy;
    }
    if let Some(width) = args.label_width {
        settings.label.context_width = width;
    }
    if args.colon_fields {
        settings.text.colon_label_fields = true;
    }

    settings.validate().map_err(|e| {
        println!("{}", ErrorReport::from(&e).to_json());
        1
    })?;
    Ok(settings)
}

/// Decode a PNG (or any format the `image` build supports) to grayscale.
pub fn load_gray_image(path: &Path) -> Result<GrayImage, SourceError> {
    image::open(path)
        .map(|img| img.into_luma8())
        .map_err(|e| SourceError::Other(format!("{}: {e}", path.display())))
}

/// Load a manifest; raster paths resolve relative to the manifest's folder.
pub fn load_document(manifest_path: &Path) -> Result<MemoryDocument, i32> {
    let manifest = Manifest::from_json(&read_text(manifest_path)?).map_err(|e| {
        eprintln!("Error: invalid manifest {}: {e}", manifest_path.display());
        1
    })?;
    let base = manifest_path.parent().unwrap_or_else(|| Path::new("."));

    MemoryDocument::from_manifest(manifest, |raster: &RasterRef| {
        load_gray_image(&base.join(&raster.path))
    })
    .map_err(|e| {
        eprintln!("Error: failed to load page raster: {e}");
        1
    })
}

/// Print `err` as a JSON error report on stdout and pick the exit code.
pub fn report_analysis_error(err: &AnalysisError) -> i32 {
    println!("{}", ErrorReport::from(err).to_json());
    if matches!(err, AnalysisError::NoFieldsFound) {
        EXIT_NO_FIELDS
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formscan::UnderscorePolicy;

    #[test]
    fn read_file_not_found() {
        assert_eq!(read_file(Path::new("/nonexistent/file.pdf")), Err(1));
    }

    #[test]
    fn flags_override_defaults() {
        let args = SettingsArgs {
            dpi: Some(150.0),
            merge_tolerance: Some(2.5),
            underscore_policy: Some(UnderscorePolicy::Any),
            label_width: Some(120.0),
            colon_fields: true,
            ..SettingsArgs::default()
        };
        let settings = load_settings(&args).unwrap();
        assert_eq!(settings.dpi, 150.0);
        assert_eq!(settings.merge.tolerance, 2.5);
        assert_eq!(settings.text.underscore_policy, UnderscorePolicy::Any);
        assert_eq!(settings.label.context_width, 120.0);
        assert!(settings.text.colon_label_fields);
    }

    #[test]
    fn settings_file_then_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"dpi": 200, "merge": {"tolerance": 8}}"#).unwrap();

        let args = SettingsArgs {
            settings: Some(path),
            merge_tolerance: Some(3.0),
            ..SettingsArgs::default()
        };
        let settings = load_settings(&args).unwrap();
        assert_eq!(settings.dpi, 200.0);
        assert_eq!(settings.merge.tolerance, 3.0);
    }

    #[test]
    fn invalid_settings_fail() {
        let args = SettingsArgs {
            dpi: Some(10.0),
            ..SettingsArgs::default()
        };
        assert_eq!(load_settings(&args), Err(1));
    }

    #[test]
    fn no_fields_has_its_own_exit_code() {
        assert_eq!(report_analysis_error(&AnalysisError::NoFieldsFound), EXIT_NO_FIELDS);
        assert_eq!(
            report_analysis_error(&AnalysisError::Configuration("missing key".to_string())),
            1
        );
    }
}
