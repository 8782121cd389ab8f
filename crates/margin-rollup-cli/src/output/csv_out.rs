use serde_json::Value;
use std::io;

/// Write output as CSV to stdout.
///
/// Roll-up results are written one line per row; anything else falls back
/// to two columns of field and value.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let result = value.get("result").unwrap_or(value);
    match result.get("rows") {
        Some(Value::Array(rows)) => write_rows(&mut wtr, rows),
        _ => write_fields(&mut wtr, result),
    }

    let _ = wtr.flush();
}

fn write_rows<W: io::Write>(wtr: &mut csv::Writer<W>, rows: &[Value]) {
    let _ = wtr.write_record(["id", "label", "margin_percent", "margin_amount", "amount", "total"]);
    for row in rows {
        let _ = wtr.write_record(row_record(row));
    }
}

/// Structured rows carry `kind`, `source_id` and `label`; legacy rows
/// carry `id` and `description`.
fn row_record(row: &Value) -> [String; 6] {
    let id = row
        .get("id")
        .or_else(|| row.get("source_id").filter(|v| !v.is_null()))
        .or_else(|| row.get("kind"))
        .map(format_csv_value)
        .unwrap_or_default();
    let label = row
        .get("label")
        .and_then(|l| l.get("value"))
        .or_else(|| row.get("description"))
        .map(format_csv_value)
        .unwrap_or_default();
    let cell = |key: &str| row.get(key).map(format_csv_value).unwrap_or_default();
    [
        id,
        label,
        cell("margin_percent"),
        cell("margin_amount"),
        cell("amount"),
        cell("total"),
    ]
}

fn write_fields<W: io::Write>(wtr: &mut csv::Writer<W>, value: &Value) {
    let _ = wtr.write_record(["field", "value"]);
    if let Value::Object(map) = value {
        for (key, val) in map {
            let _ = wtr.write_record([key.as_str(), &format_csv_value(val)]);
        }
    } else {
        let _ = wtr.write_record(["value", &format_csv_value(value)]);
    }
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
