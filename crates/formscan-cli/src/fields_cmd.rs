use std::path::Path;

use formscan::write::{list_fields, page_boxes};

use crate::cli::OutputFormat;
use crate::shared::read_file;

pub fn run(file: &Path, format: &OutputFormat) -> Result<(), i32> {
    let pdf = read_file(file)?;
    let to_code = |e: formscan::write::WriteError| {
        eprintln!("Error: failed to read PDF: {e}");
        1
    };
    let names = list_fields(&pdf).map_err(to_code)?;
    let pages = page_boxes(&pdf).map_err(to_code)?;

    match format {
        OutputFormat::Text => {
            if names.is_empty() {
                println!("No form fields found.");
            } else {
                for name in &names {
                    println!("{name}");
                }
            }
        }
        OutputFormat::Json => {
            let sizes: Vec<serde_json::Value> = pages
                .iter()
                .map(|p| serde_json::json!({"width": p.width, "height": p.height}))
                .collect();
            let output = serde_json::json!({
                "fields": names,
                "pages": sizes,
            });
            println!("{}", serde_json::to_string_pretty(&output).unwrap_or_default());
        }
    }
    Ok(())
}
