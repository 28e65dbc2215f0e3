pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::Value;

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// Render a scalar or a money object (`{"amount", "currency", "precision"}`)
/// as a single cell.
pub(crate) fn cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Object(map) if map.contains_key("amount") && map.contains_key("currency") => {
            money_cell(map)
        }
        Value::Array(arr) => arr.iter().map(cell).collect::<Vec<_>>().join(", "),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}

fn money_cell(map: &serde_json::Map<String, Value>) -> String {
    let minor = map.get("amount").and_then(Value::as_i64).unwrap_or_default();
    let precision = map
        .get("precision")
        .and_then(Value::as_u64)
        .unwrap_or(2) as u32;
    let currency = map.get("currency").and_then(Value::as_str).unwrap_or_default();
    format!("{} {}", currency, rust_decimal::Decimal::new(minor, precision))
}
