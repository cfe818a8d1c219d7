//! Parallel dispatcher.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::warn;

use super::progress::ProgressObserver;
use super::ApiFunction;
use crate::batch::{ApiResponse, BatchResponse, DispatchUnit, UnitKind};
use crate::policy::ErrorHandling;
use crate::row::Row;
use crate::{Error, ErrorContext, Result};

/// A unit-level failure captured under [`ErrorHandling::Warn`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiFailure {
    pub message: String,
    pub error_type: String,
    /// Debug rendering of the error, written only in verbose mode.
    pub raw: String,
}

impl ApiFailure {
    pub fn from_error(err: &Error) -> Self {
        Self {
            message: err.to_string(),
            error_type: err.error_type(),
            raw: format!("{:?}", err),
        }
    }
}

/// Tagged result of one dispatch unit.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiOutcome {
    Success(ApiResponse),
    Failure(ApiFailure),
}

async fn call_unit(api: &dyn ApiFunction, unit: &DispatchUnit, rows: &[Row]) -> Result<ApiResponse> {
    match unit.kind {
        UnitKind::Row => api.call_row(&rows[unit.start]).await.map(ApiResponse::Single),
        UnitKind::Batch => api
            .call_batch(unit.rows(rows))
            .await
            .map(ApiResponse::Batch),
    }
}

/// The first batch item without a result, as a run-ending error.
///
/// Items are checked in row order. An `ErrorList` entry and an item missing
/// from both lists are treated alike.
fn first_item_failure(unit: &DispatchUnit, batch: &BatchResponse) -> Option<Error> {
    (0..unit.len).find_map(|i| {
        if batch.result_for(i).is_some() {
            return None;
        }
        let row = unit.start + i;
        let (error_type, message) = match batch.error_for(i) {
            Some(e) => (e.error_code.clone(), e.error_message.clone()),
            None => (
                "MissingBatchResult".to_string(),
                "no result or error returned".to_string(),
            ),
        };
        Some(Error::runtime_with_context(
            format!("Batch item for row {} failed: {}: {}", row, error_type, message),
            ErrorContext::new()
                .with_details(format!("unit {}, in-batch index {}", unit.index, i))
                .with_source("parallel_dispatcher"),
        ))
    })
}

/// Runs every unit on the worker pool, at most `parallel_workers` at a time.
///
/// Results come back in completion order, each paired with its unit. Under
/// [`ErrorHandling::Fail`] the first error is returned and outstanding tasks
/// are aborted; under [`ErrorHandling::Warn`] it becomes that unit's outcome.
/// A batch that succeeded as a call but reports a failed item counts as an
/// error under `Fail`.
pub async fn dispatch(
    units: &[DispatchUnit],
    rows: Arc<Vec<Row>>,
    api: Arc<dyn ApiFunction>,
    parallel_workers: usize,
    error_handling: ErrorHandling,
    progress: &dyn ProgressObserver,
) -> Result<Vec<(DispatchUnit, ApiOutcome)>> {
    let pool = Arc::new(Semaphore::new(parallel_workers.max(1)));
    let mut tasks = JoinSet::new();

    for unit in units.iter().copied() {
        let pool = Arc::clone(&pool);
        let api = Arc::clone(&api);
        let rows = Arc::clone(&rows);
        tasks.spawn(async move {
            let result = match pool.acquire_owned().await {
                Ok(permit) => {
                    let r = call_unit(api.as_ref(), &unit, &rows).await;
                    drop(permit);
                    r
                }
                Err(_) => Err(Error::runtime_with_context(
                    "Worker pool closed",
                    ErrorContext::new().with_source("parallel_dispatcher"),
                )),
            };
            (unit, result)
        });
    }

    let total = units.len();
    let mut completed = 0usize;
    let mut outcomes = Vec::with_capacity(total);

    while let Some(joined) = tasks.join_next().await {
        let (unit, result) = joined.map_err(|e| {
            Error::runtime_with_context(
                format!("Worker task failed: {}", e),
                ErrorContext::new().with_source("parallel_dispatcher"),
            )
        })?;
        completed += 1;
        progress.on_progress(completed, total);

        let result = match (result, error_handling) {
            (Ok(ApiResponse::Batch(batch)), ErrorHandling::Fail) => match first_item_failure(&unit, &batch) {
                Some(err) => Err(err),
                None => Ok(ApiResponse::Batch(batch)),
            },
            (result, _) => result,
        };

        match result {
            Ok(response) => outcomes.push((unit, ApiOutcome::Success(response))),
            Err(err) => match error_handling {
                ErrorHandling::Fail => {
                    tasks.abort_all();
                    return Err(err);
                }
                ErrorHandling::Warn => {
                    warn!(
                        unit = unit.index,
                        first_row = unit.start,
                        rows = unit.len,
                        error = %err,
                        "API call failed, recording error columns"
                    );
                    outcomes.push((unit, ApiOutcome::Failure(ApiFailure::from_error(&err))));
                }
            },
        }
    }

    Ok(outcomes)
}
