//! End-to-end document scenarios through the public facade.

use formscan::{
    AnalysisError, BBox, ErrorReport, FieldSource, FormAnalyzer, GrayImage, HeuristicSettings,
    Luma, Manifest, MemoryDocument, MemoryPage, PageSize, Raster, TextToken, UnderscorePolicy,
};

fn white_page(width: u32, height: u32) -> GrayImage {
    GrayImage::from_pixel(width, height, Luma([255]))
}

fn rule(image: &mut GrayImage, x0: u32, y0: u32, x1: u32, y1: u32) {
    for y in y0..y1 {
        for x in x0..x1 {
            image.put_pixel(x, y, Luma([0]));
        }
    }
}

fn token(text: &str, x0: f64, top: f64, x1: f64, bottom: f64, page: usize) -> TextToken {
    TextToken::new(text, BBox::new(x0, top, x1, bottom), page)
}

#[test]
fn name_label_with_underscore_run() {
    let json = r#"{"pages": [{"width": 612, "height": 792, "tokens": [
        {"text": "Name:", "x0": 100, "top": 100, "x1": 140, "bottom": 110},
        {"text": "______", "x0": 145, "top": 100, "x1": 300, "bottom": 110}
    ]}]}"#;
    let doc = MemoryDocument::from_manifest_text_only(Manifest::from_json(json).unwrap());
    let result = FormAnalyzer::default().analyze(&doc).unwrap();
    let bp = result.value;

    assert_eq!(bp.len(), 1);
    let field = &bp.form_fields[0];
    assert_eq!(field.field_name, "name");
    assert_eq!(field.page_number, 1);
    let rect = field.page_rect(612.0, 792.0).unwrap();
    assert!(rect.approx_eq(&BBox::new(145.0, 100.0, 300.0, 110.0), 1e-6));
    for p in &field.coordinates {
        assert!((0.0..=1.0).contains(&p.x) && (0.0..=1.0).contains(&p.y));
    }
}

#[test]
fn blank_pages_yield_no_fields_found() {
    let doc = MemoryDocument::from_pages(vec![
        MemoryPage::new(PageSize::letter()).with_raster(Raster::new(white_page(612, 792), 72.0)),
        MemoryPage::new(PageSize::letter()),
    ]);
    let err = FormAnalyzer::default().analyze(&doc).unwrap_err();
    assert_eq!(err, AnalysisError::NoFieldsFound);

    let report = ErrorReport::from(&err);
    let value: serde_json::Value = serde_json::from_str(&report.to_json()).unwrap();
    assert!(value["error"].as_str().unwrap().contains("no form fields"));
}

#[test]
fn signature_fields_never_reach_blueprint() {
    let doc = MemoryDocument::from_pages(vec![MemoryPage::new(PageSize::letter()).with_tokens(vec![
        token("Date:", 60.0, 100.0, 90.0, 110.0, 1),
        token("________", 95.0, 100.0, 250.0, 110.0, 1),
        token("Vendor", 20.0, 200.0, 60.0, 210.0, 1),
        token("Signature:", 62.0, 200.0, 120.0, 210.0, 1),
        token("________", 125.0, 200.0, 300.0, 210.0, 1),
    ])]);
    let settings = HeuristicSettings {
        text: formscan::TextScanSettings {
            colon_label_fields: true,
            ..Default::default()
        },
        ..HeuristicSettings::default()
    };
    let bp = FormAnalyzer::new(settings).unwrap().analyze(&doc).unwrap().value;
    for f in &bp.form_fields {
        assert!(!f.field_name.contains("signature"), "{:?}", f);
        assert!(!f.label.to_lowercase().contains("signature"), "{:?}", f);
    }
    assert!(bp.field_names().contains(&"date"));
}

#[test]
fn same_row_fields_are_named_by_their_own_labels() {
    let doc = MemoryDocument::from_pages(vec![MemoryPage::new(PageSize::letter()).with_tokens(vec![
        token("Phone:", 60.0, 300.0, 100.0, 310.0, 1),
        token("_________", 105.0, 300.0, 220.0, 310.0, 1),
        token("Fax:", 230.0, 300.0, 255.0, 310.0, 1),
        token("_________", 260.0, 300.0, 380.0, 310.0, 1),
    ])]);
    let bp = FormAnalyzer::default().analyze(&doc).unwrap().value;
    assert_eq!(bp.field_names(), vec!["phone", "fax"]);
}

#[test]
fn unlabeled_blank_gets_placeholder_name() {
    let doc = MemoryDocument::from_pages(vec![
        MemoryPage::new(PageSize::letter()),
        MemoryPage::new(PageSize::letter())
            .with_tokens(vec![token("__________", 320.4, 500.0, 480.0, 510.0, 2)]),
    ]);
    let bp = FormAnalyzer::default().analyze(&doc).unwrap().value;
    assert_eq!(bp.field_names(), vec!["unnamed_field_2320"]);
    assert_eq!(bp.form_fields[0].label, "Unnamed Field 2-320");
    assert_eq!(bp.form_fields[0].page_number, 2);
}

#[test]
fn underscore_policy_controls_recall() {
    let tokens = vec![token("Date__", 100.0, 100.0, 160.0, 110.0, 1)];
    let doc = MemoryDocument::from_pages(vec![MemoryPage::new(PageSize::letter()).with_tokens(tokens)]);

    let default_policy = FormAnalyzer::default().analyze(&doc);
    assert_eq!(default_policy.unwrap_err(), AnalysisError::NoFieldsFound);

    let mut settings = HeuristicSettings::default();
    settings.text.underscore_policy = UnderscorePolicy::Any;
    let bp = FormAnalyzer::new(settings).unwrap().analyze(&doc).unwrap().value;
    assert_eq!(bp.len(), 1);
}

#[test]
fn rendered_fill_line_is_detected_and_labelled() {
    // Letter page at 150 DPI: 1275 x 1650 px, 150/72 px per point.
    let mut image = white_page(1275, 1650);
    // A rule from 200pt to 450pt at y = 300pt.
    rule(&mut image, 417, 625, 938, 627);
    // Page border, spanning the width.
    rule(&mut image, 10, 40, 1265, 43);
    let page = MemoryPage::new(PageSize::letter())
        .with_tokens(vec![token("Company:", 140.0, 290.0, 195.0, 302.0, 1)])
        .with_raster(Raster::new(image, 150.0));
    let doc = MemoryDocument::from_pages(vec![page]);

    let result = FormAnalyzer::default().analyze(&doc).unwrap();
    let bp = result.value;
    assert_eq!(bp.field_names(), vec!["company"]);
    let field = &bp.form_fields[0];
    assert_eq!(field.source, Some(FieldSource::Line));
    let rect = field.page_rect(612.0, 792.0).unwrap();
    assert!((rect.x0 - 200.2).abs() < 1.0, "{rect:?}");
    assert!((rect.x1 - 450.0).abs() < 1.0, "{rect:?}");
    assert!(rect.top < 300.5 && rect.bottom > 300.5, "{rect:?}");
}
