use colored::Colorize;
use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::cell;

/// Format output as tables. Scalars of a result go into one field/value
/// table; every array of objects inside it gets a table of its own.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => match map.get("result") {
            Some(result) => print_result_table(result, map),
            None => print_object(map),
        },
        Value::Array(arr) => print_array_table(arr),
        _ => println!("{}", value),
    }
}

fn print_result_table(result: &Value, envelope: &Map<String, Value>) {
    match result {
        Value::Object(res_map) => print_object(res_map),
        Value::Array(rows) => print_array_table(rows),
        other => println!("{}", cell(other)),
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\n{}", "Warnings:".yellow().bold());
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn print_object(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    let mut nested: Vec<(&String, &Vec<Value>)> = Vec::new();
    for (key, val) in map {
        match val {
            Value::Array(rows) if rows.first().is_some_and(Value::is_object) && !is_money(&rows[0]) => {
                nested.push((key, rows));
            }
            Value::Object(inner) if !is_money(val) => {
                for (k, v) in inner {
                    builder.push_record([format!("{key}.{k}"), cell(v)]);
                }
            }
            _ => builder.push_record([key.clone(), cell(val)]),
        }
    }
    println!("{}", Table::from(builder));

    for (key, rows) in nested {
        println!("\n{}", key.bold());
        print_array_table(rows);
    }
}

fn print_array_table(arr: &[Value]) {
    let Some(Value::Object(first)) = arr.first() else {
        if arr.is_empty() {
            println!("(empty)");
        }
        for item in arr {
            println!("{}", cell(item));
        }
        return;
    };

    let headers: Vec<String> = first.keys().cloned().collect();
    let mut builder = Builder::default();
    builder.push_record(&headers);
    for item in arr {
        if let Value::Object(map) = item {
            let row: Vec<String> = headers
                .iter()
                .map(|h| map.get(h.as_str()).map(cell).unwrap_or_default())
                .collect();
            builder.push_record(row);
        }
    }
    println!("{}", Table::from(builder));
}

fn is_money(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|m| m.contains_key("amount") && m.contains_key("currency"))
}
