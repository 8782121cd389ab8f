use serde_json::Value;
use std::io::{self, Write};

/// Pretty-print JSON to stdout. Decimals stay strings, so no precision is lost.
pub fn print_json(value: &Value) {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let written = serde_json::to_writer_pretty(&mut out, value)
        .and_then(|_| writeln!(out).map_err(serde_json::Error::io));
    if let Err(e) = written {
        eprintln!("JSON serialization error: {}", e);
    }
}
