//! CSV row rendering.
//!
//! Cells are rendered from JSON values and quoted only when they contain a
//! separator, quote or line break, so a row always has exactly one field per
//! header column.

use std::borrow::Cow;

use serde_json::{Map, Value};

/// Render the header line (with trailing newline) for a column set.
pub fn header_line(columns: &[&str]) -> String {
    let mut line = columns.join(",");
    line.push('\n');
    line
}

/// Render one data line (with trailing newline) in column order.
///
/// Keys in `data` that are not columns are dropped; columns missing from
/// `data` become empty cells.
pub fn render_row(columns: &[&str], data: &Map<String, Value>) -> String {
    let mut line = String::new();
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            line.push(',');
        }
        if let Some(value) = data.get(*column) {
            line.push_str(&quote_cell(&render_value(value)));
        }
    }
    line.push('\n');
    line
}

/// Render a JSON value as cell text, before quoting.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => render_number(n),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(render_value)
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => value.to_string(),
    }
}

fn render_number(n: &serde_json::Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        // 5.0 from a client is the integer 5 in the log
        Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => {
            (f as i64).to_string()
        }
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

fn quote_cell(cell: &str) -> Cow<'_, str> {
    if cell.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", cell.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(cell)
    }
}
