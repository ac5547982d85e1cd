use std::collections::BTreeMap;
use std::path::Path;

use formscan::write::fill_fields;

use crate::shared::{read_file, read_text, write_file};

/// Parse `{"name": "value", ...}`; numbers and booleans are stringified.
fn parse_values(json: &str) -> Result<BTreeMap<String, String>, String> {
    let value: serde_json::Value = serde_json::from_str(json).map_err(|e| e.to_string())?;
    let object = value
        .as_object()
        .ok_or_else(|| "expected a JSON object of field names to values".to_string())?;
    object
        .iter()
        .map(|(name, v)| {
            let text = match v {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::Bool(b) => b.to_string(),
                _ => return Err(format!("value for '{name}' must be a string")),
            };
            Ok((name.clone(), text))
        })
        .collect()
}

pub fn run(file: &Path, values: &Path, output: &Path) -> Result<(), i32> {
    let pdf = read_file(file)?;
    let values = parse_values(&read_text(values)?).map_err(|e| {
        eprintln!("Error: invalid values file: {e}");
        1
    })?;

    let report = fill_fields(&pdf, &values).map_err(|e| {
        eprintln!("Error: {e}");
        1
    })?;
    write_file(output, &report.pdf)?;

    for name in &report.not_found {
        eprintln!("Warning: no text field named '{name}'");
    }
    let summary = serde_json::json!({
        "output": output.display().to_string(),
        "filled": report.filled,
        "not_found": report.not_found,
    });
    println!("{}", serde_json::to_string_pretty(&summary).unwrap_or_default());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_become_strings() {
        let values = parse_values(r#"{"name": "Ada", "age": 36, "member": true}"#).unwrap();
        assert_eq!(values["name"], "Ada");
        assert_eq!(values["age"], "36");
        assert_eq!(values["member"], "true");
    }

    #[test]
    fn nested_values_rejected() {
        let err = parse_values(r#"{"address": {"city": "Oslo"}}"#).unwrap_err();
        assert!(err.contains("address"));
    }

    #[test]
    fn non_object_rejected() {
        assert!(parse_values(r#"["a", "b"]"#).is_err());
    }
}
