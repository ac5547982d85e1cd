use std::path::Path;

use formscan::Blueprint;
use formscan::write::apply_blueprint;

use crate::shared::{read_file, read_text, write_file};

pub fn run(file: &Path, blueprint: &Path, output: &Path) -> Result<(), i32> {
    let pdf = read_file(file)?;
    let blueprint = Blueprint::from_json(&read_text(blueprint)?).map_err(|e| {
        eprintln!("Error: invalid blueprint: {e}");
        1
    })?;

    let report = apply_blueprint(&pdf, &blueprint).map_err(|e| {
        eprintln!("Error: {e}");
        1
    })?;
    write_file(output, &report.pdf)?;

    let summary = serde_json::json!({
        "output": output.display().to_string(),
        "created": report.created,
        "skipped": report.skipped,
    });
    println!("{}", serde_json::to_string_pretty(&summary).unwrap_or_default());
    Ok(())
}
