pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use colored::Colorize;
use serde_json::Value;

/// Dispatch output to the appropriate formatter.
///
/// JSON and table output carry the envelope warnings themselves; for CSV
/// and minimal output they go to stderr so stdout stays parseable.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => {
            csv_out::print_csv(value);
            print_warnings(value);
        }
        OutputFormat::Minimal => {
            minimal::print_minimal(value);
            print_warnings(value);
        }
    }
}

fn print_warnings(value: &Value) {
    for warning in warnings(value) {
        eprintln!("{}: {}", "warning".yellow().bold(), warning);
    }
}

fn warnings(value: &Value) -> Vec<&str> {
    value
        .get("warnings")
        .and_then(Value::as_array)
        .map(|w| w.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}
