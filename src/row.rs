//! Row representation shared by datasets, the parallelizer and the formatters.

use serde_json::{Map, Value};

/// An ordered mapping from column name to value.
///
/// Column order is insertion order, so derived columns always land after the
/// input columns.
pub type Row = Map<String, Value>;

/// Returns the trimmed text held in `column`, or `None` when the cell is
/// missing, not a string, or blank.
pub fn text_cell<'a>(row: &'a Row, column: &str) -> Option<&'a str> {
    match row.get(column) {
        Some(Value::String(s)) => {
            let s = s.trim();
            (!s.is_empty()).then_some(s)
        }
        _ => None,
    }
}

/// Rounds to 2 decimals; every probability written to an output column goes through here.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
