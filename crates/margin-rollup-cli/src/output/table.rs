use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

const ROW_COLUMNS: [&str; 5] = ["Row", "Margin %", "Margin", "Amount", "Total"];

/// Format output as tables using the tabled crate.
///
/// A roll-up result prints its rows first, then the scalar summary fields.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => match map.get("result") {
            Some(Value::Object(result)) => print_result(result, map),
            _ => print_fields(map),
        },
        Value::Array(arr) => {
            for item in arr {
                println!("{}", format_value(item));
            }
        }
        _ => println!("{}", value),
    }
}

fn print_result(result: &Map<String, Value>, envelope: &Map<String, Value>) {
    if let Some(Value::Array(rows)) = result.get("rows") {
        println!("{}", rows_table(rows));
        println!();
    }

    let summary: Map<String, Value> = result
        .iter()
        .filter(|(key, _)| key.as_str() != "rows")
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    print_fields(&summary);

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {}", w);
            }
        }
    }
}

fn rows_table(rows: &[Value]) -> Table {
    let mut builder = Builder::default();
    builder.push_record(ROW_COLUMNS);
    for row in rows.iter().filter_map(Value::as_object) {
        builder.push_record([
            row_label(row),
            field(row, "margin_percent"),
            field(row, "margin_amount"),
            field(row, "amount"),
            field(row, "total"),
        ]);
    }
    Table::from(builder)
}

/// Structured rows carry a `label`, legacy rows a plain `description`.
fn row_label(row: &Map<String, Value>) -> String {
    match row.get("label") {
        Some(Value::Object(label)) => label.get("value").map(format_value).unwrap_or_default(),
        _ => field(row, "description"),
    }
}

fn field(row: &Map<String, Value>, key: &str) -> String {
    row.get(key).map(format_value).unwrap_or_default()
}

fn print_fields(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        builder.push_record([key.as_str(), &format_value(val)]);
    }
    println!("{}", Table::from(builder));
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "-".to_string(),
        Value::Array(arr) => arr.iter().map(format_value).collect::<Vec<_>>().join(", "),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_row_label_prefers_structured_label() {
        let row = json!({"label": {"type": "key", "value": "rollup.total_net"}, "description": "x"});
        assert_eq!(row_label(row.as_object().unwrap()), "rollup.total_net");
    }

    #[test]
    fn test_row_label_falls_back_to_description() {
        let row = json!({"id": -3, "description": "rollup.total_net"});
        assert_eq!(row_label(row.as_object().unwrap()), "rollup.total_net");
    }

    #[test]
    fn test_rows_table_contains_values() {
        let rows = vec![json!({
            "label": {"type": "entity", "value": "Network"},
            "margin_percent": "0.10",
            "margin_amount": "90.00",
            "amount": "900",
            "total": "990.00"
        })];
        let rendered = rows_table(&rows).to_string();
        assert!(rendered.contains("Network"));
        assert!(rendered.contains("990.00"));
        assert!(rendered.contains("Margin %"));
    }
}
