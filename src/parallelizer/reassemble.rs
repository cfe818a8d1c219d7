//! Result reassembler.

use serde_json::Value;
use tracing::warn;

use super::dispatch::{ApiFailure, ApiOutcome};
use crate::batch::{ApiResponse, DispatchUnit};
use crate::naming::ApiColumnNames;
use crate::row::Row;
use crate::{Error, ErrorContext, Result};

/// Derived cells for one input row.
#[derive(Debug, Clone, Default)]
struct Derived {
    response: String,
    error_message: String,
    error_type: String,
    error_raw: String,
}

impl Derived {
    fn response(response: String) -> Self {
        Self {
            response,
            ..Default::default()
        }
    }

    fn failure(f: &ApiFailure) -> Self {
        Self {
            response: String::new(),
            error_message: f.message.clone(),
            error_type: f.error_type.clone(),
            error_raw: f.raw.clone(),
        }
    }
}

fn unzip_batch(unit: &DispatchUnit, outcome: &ApiOutcome) -> Result<Vec<Derived>> {
    let mut out = Vec::with_capacity(unit.len);
    match outcome {
        ApiOutcome::Failure(f) => out.resize(unit.len, Derived::failure(f)),
        ApiOutcome::Success(ApiResponse::Single(raw)) => {
            // A single-row call always maps to exactly one row.
            out.push(Derived::response(raw.clone()));
            out.resize(unit.len, Derived::default());
        }
        ApiOutcome::Success(ApiResponse::Batch(batch)) => {
            for i in 0..unit.len {
                if let Some(item) = batch.result_for(i) {
                    out.push(Derived::response(serde_json::to_string(item)?));
                } else if let Some(e) = batch.error_for(i) {
                    warn!(
                        unit = unit.index,
                        row = unit.start + i,
                        error_code = e.error_code.as_str(),
                        "batch item failed: {}",
                        e.error_message
                    );
                    out.push(Derived {
                        response: String::new(),
                        error_message: e.error_message.clone(),
                        error_type: e.error_code.clone(),
                        error_raw: serde_json::to_string(e)?,
                    });
                } else {
                    warn!(unit = unit.index, row = unit.start + i, "batch response has no entry for item");
                    out.push(Derived::failure(&ApiFailure {
                        message: format!("No result or error returned for batch item {}", i),
                        error_type: "MissingBatchResult".to_string(),
                        raw: String::new(),
                    }));
                }
            }
        }
    }
    Ok(out)
}

/// Restores input order and appends the response and error columns.
///
/// Output rows keep every input cell untouched; the derived columns follow
/// in the order given by [`ApiColumnNames::ordered`].
pub fn reassemble(
    rows: &[Row],
    outcomes: Vec<(DispatchUnit, ApiOutcome)>,
    columns: &ApiColumnNames,
    verbose: bool,
) -> Result<Vec<Row>> {
    let mut slots: Vec<Option<Derived>> = vec![None; rows.len()];

    for (unit, outcome) in &outcomes {
        let derived = unzip_batch(unit, outcome)?;
        for (pos, d) in unit.row_range().zip(derived) {
            let slot = slots.get_mut(pos).ok_or_else(|| {
                Error::runtime_with_context(
                    format!("Unit {} points past the end of the input", unit.index),
                    ErrorContext::new().with_source("result_reassembler"),
                )
            })?;
            *slot = Some(d);
        }
    }

    rows.iter()
        .zip(slots)
        .enumerate()
        .map(|(pos, (row, slot))| {
            let d = slot.ok_or_else(|| {
                Error::runtime_with_context(
                    format!("No outcome recorded for row {}", pos),
                    ErrorContext::new().with_source("result_reassembler"),
                )
            })?;
            let mut out = row.clone();
            out.insert(columns.response.clone(), Value::String(d.response));
            out.insert(columns.error_message.clone(), Value::String(d.error_message));
            out.insert(columns.error_type.clone(), Value::String(d.error_type));
            if verbose {
                out.insert(columns.error_raw.clone(), Value::String(d.error_raw));
            }
            Ok(out)
        })
        .collect()
}
