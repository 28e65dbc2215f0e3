use serde_json::Value;

use super::cell;

/// Print just the headline figure of the output: the first well-known field
/// present, else the first field of the result.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    let priority_keys = [
        "runway_months",
        "probability_weighted_ending_cash",
        "equity",
        "ending_cash",
        "total_taxes",
        "summary",
    ];

    if let Value::Object(map) = result_obj {
        for key in &priority_keys {
            match map.get(*key) {
                Some(Value::Object(inner)) if *key == "summary" => {
                    if let Some(runway) = inner.get("runway_months") {
                        println!("{}", cell(runway));
                        return;
                    }
                }
                Some(val) if !val.is_null() => {
                    println!("{}", cell(val));
                    return;
                }
                _ => {}
            }
        }

        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, cell(val));
            return;
        }
    }

    // A bare sequence: report its last row
    if let Value::Array(rows) = result_obj {
        if let Some(last) = rows.last() {
            println!("{}", cell(last.get("ending_cash").unwrap_or(last)));
            return;
        }
    }

    println!("{}", cell(result_obj));
}
