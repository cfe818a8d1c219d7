//! 并行调度模块：对数据行并发调用 API，并按原始顺序重组结果。
//!
//! # Parallel Dispatch Module
//!
//! [`DataFrameParallelizer`] is the core of the crate. It cuts the input rows
//! into dispatch units ([`crate::batch::partition`]), runs each unit's API call
//! on a bounded pool of tokio tasks, and merges the responses (or captured
//! errors) back into the rows in their original order.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`ApiFunction`] | The per-unit call: one row, or one batch of rows |
//! | [`dispatch`] | Bounded-concurrency worker pool honouring the FAIL/WARN policy |
//! | [`reassemble`] | Order restoration and response/error column fill |
//! | [`ProgressObserver`] | Completed / total notifications |
//!
//! ## Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use comprehend_nlp::batch::BatchResponse;
//! use comprehend_nlp::parallelizer::{ApiFunction, DataFrameParallelizer, ParallelizerConfig};
//! use comprehend_nlp::row::Row;
//! use std::sync::Arc;
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl ApiFunction for Echo {
//!     async fn call_row(&self, row: &Row) -> comprehend_nlp::Result<String> {
//!         Ok(serde_json::to_string(&row["text"])?)
//!     }
//!     async fn call_batch(&self, _rows: &[Row]) -> comprehend_nlp::Result<BatchResponse> {
//!         Ok(BatchResponse::default())
//!     }
//! }
//!
//! # tokio_test::block_on(async {
//! let mut row = Row::new();
//! row.insert("text".into(), "hello".into());
//!
//! let parallelizer = DataFrameParallelizer::new(ParallelizerConfig::default());
//! let columns = parallelizer.column_names(&["text"]).unwrap();
//! let out = parallelizer.run(vec![row], &columns, Arc::new(Echo)).await.unwrap();
//! assert_eq!(out[0]["api_response"], "\"hello\"");
//! # });
//! ```

mod dispatch;
mod progress;
mod reassemble;

pub use dispatch::{dispatch, ApiFailure, ApiOutcome};
pub use progress::{LogProgress, NoopProgress, ProgressObserver};
pub use reassemble::reassemble;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::batch::{partition, BatchConfig, BatchResponse};
use crate::naming::ApiColumnNames;
use crate::policy::ErrorHandling;
use crate::row::Row;
use crate::Result;

/// The call made for one dispatch unit.
///
/// `call_row` returns the raw JSON response text, or an empty string when
/// the row was not sent. `call_batch` receives the batch rows in input order.
#[async_trait]
pub trait ApiFunction: Send + Sync {
    async fn call_row(&self, row: &Row) -> Result<String>;

    async fn call_batch(&self, rows: &[Row]) -> Result<BatchResponse>;
}

#[derive(Debug, Clone)]
pub struct ParallelizerConfig {
    pub parallel_workers: usize,
    pub batch: BatchConfig,
    pub error_handling: ErrorHandling,
    /// Also write the raw error detail column.
    pub verbose: bool,
    pub output_column_prefix: String,
}

impl Default for ParallelizerConfig {
    fn default() -> Self {
        Self {
            parallel_workers: 4,
            batch: BatchConfig::default(),
            error_handling: ErrorHandling::default(),
            verbose: false,
            output_column_prefix: "api".to_string(),
        }
    }
}

pub struct DataFrameParallelizer {
    config: ParallelizerConfig,
    progress: Arc<dyn ProgressObserver>,
}

impl DataFrameParallelizer {
    pub fn new(config: ParallelizerConfig) -> Self {
        Self {
            config,
            progress: Arc::new(NoopProgress),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressObserver>) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &ParallelizerConfig {
        &self.config
    }

    /// Response and error column names, unique against `input_columns`.
    pub fn column_names<S: AsRef<str>>(&self, input_columns: &[S]) -> Result<ApiColumnNames> {
        ApiColumnNames::new(&self.config.output_column_prefix, input_columns)
    }

    /// Calls `api` for every row and returns one output row per input row.
    pub async fn run(
        &self,
        rows: Vec<Row>,
        columns: &ApiColumnNames,
        api: Arc<dyn ApiFunction>,
    ) -> Result<Vec<Row>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let units = partition(rows.len(), &self.config.batch);
        info!(
            rows = rows.len(),
            units = units.len(),
            workers = self.config.parallel_workers,
            batched = self.config.batch.batch_support,
            "dispatching API calls"
        );

        let rows = Arc::new(rows);
        let outcomes = dispatch(
            &units,
            Arc::clone(&rows),
            api,
            self.config.parallel_workers,
            self.config.error_handling,
            self.progress.as_ref(),
        )
        .await?;

        reassemble(&rows, outcomes, columns, self.config.verbose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Echoes the `id` cell after an id-dependent delay; fails on listed ids.
    struct Scripted {
        fail_ids: Vec<u64>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(fail_ids: Vec<u64>) -> Self {
            Self {
                fail_ids,
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                calls: AtomicUsize::new(0),
            }
        }

        async fn work(&self, id: u64) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis((id * 7) % 11 + 1)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if self.fail_ids.contains(&id) {
                return Err(Error::runtime(format!("row {} rejected", id)));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl ApiFunction for Scripted {
        async fn call_row(&self, row: &Row) -> Result<String> {
            let id = row["id"].as_u64().unwrap_or_default();
            self.work(id).await?;
            Ok(json!({"echo": id}).to_string())
        }

        async fn call_batch(&self, rows: &[Row]) -> Result<BatchResponse> {
            let first = rows[0]["id"].as_u64().unwrap_or_default();
            self.work(first).await?;
            let results = rows
                .iter()
                .enumerate()
                .map(|(i, r)| json!({"Index": i, "echo": r["id"]}))
                .collect();
            Ok(BatchResponse {
                result_list: results,
                error_list: Vec::new(),
            })
        }
    }

    fn rows(n: usize) -> Vec<Row> {
        (0..n)
            .map(|i| json!({"id": i}).as_object().cloned().unwrap())
            .collect()
    }

    fn parallelizer(workers: usize, batch: BatchConfig, policy: ErrorHandling) -> DataFrameParallelizer {
        DataFrameParallelizer::new(ParallelizerConfig {
            parallel_workers: workers,
            batch,
            error_handling: policy,
            ..Default::default()
        })
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_order_is_restored_under_uneven_latency() {
        let p = parallelizer(8, BatchConfig::single_rows(), ErrorHandling::Warn);
        let columns = p.column_names(&["id"]).unwrap();
        let out = p.run(rows(40), &columns, Arc::new(Scripted::new(vec![]))).await.unwrap();
        assert_eq!(out.len(), 40);
        for (i, r) in out.iter().enumerate() {
            assert_eq!(r["id"], i);
            assert_eq!(r["api_response"], json!({"echo": i}).to_string());
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_is_bounded() {
        let api = Arc::new(Scripted::new(vec![]));
        let p = parallelizer(3, BatchConfig::single_rows(), ErrorHandling::Warn);
        let columns = p.column_names(&["id"]).unwrap();
        p.run(rows(30), &columns, api.clone()).await.unwrap();
        assert!(api.max_in_flight.load(Ordering::SeqCst) <= 3);
        assert_eq!(api.calls.load(Ordering::SeqCst), 30);
    }

    #[tokio::test]
    async fn test_warn_keeps_failed_rows() {
        let p = parallelizer(4, BatchConfig::single_rows(), ErrorHandling::Warn);
        let columns = p.column_names(&["id"]).unwrap();
        let out = p
            .run(rows(6), &columns, Arc::new(Scripted::new(vec![2, 5])))
            .await
            .unwrap();
        assert_eq!(out.len(), 6);
        assert_eq!(out[2]["api_response"], "");
        assert_eq!(out[2]["api_error_message"], "Runtime error: row 2 rejected");
        assert_eq!(out[2]["api_error_type"], "RuntimeError");
        assert_eq!(out[3]["api_error_message"], "");
        assert!(!out[0].contains_key("api_error_raw"));
    }

    #[tokio::test]
    async fn test_fail_aborts_run() {
        let p = parallelizer(2, BatchConfig::single_rows(), ErrorHandling::Fail);
        let columns = p.column_names(&["id"]).unwrap();
        let err = p
            .run(rows(10), &columns, Arc::new(Scripted::new(vec![4])))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("row 4 rejected"));
    }

    #[tokio::test]
    async fn test_batched_failure_covers_whole_batch() {
        let p = DataFrameParallelizer::new(ParallelizerConfig {
            parallel_workers: 2,
            batch: BatchConfig::batched(3),
            error_handling: ErrorHandling::Warn,
            verbose: true,
            output_column_prefix: "api".to_string(),
        });
        let columns = p.column_names(&["id"]).unwrap();
        let out = p
            .run(rows(7), &columns, Arc::new(Scripted::new(vec![3])))
            .await
            .unwrap();
        assert_eq!(out.len(), 7);
        for i in 3..6 {
            assert_eq!(out[i]["api_response"], "");
            assert_ne!(out[i]["api_error_raw"], "");
        }
        assert!(out[6]["api_response"].as_str().unwrap().contains("\"echo\":6"));
    }

    #[tokio::test]
    async fn test_empty_input() {
        let p = parallelizer(2, BatchConfig::single_rows(), ErrorHandling::Fail);
        let columns = p.column_names(&["id"]).unwrap();
        let out = p.run(Vec::new(), &columns, Arc::new(Scripted::new(vec![]))).await.unwrap();
        assert!(out.is_empty());
    }

    struct Recorder(Mutex<Vec<(usize, usize)>>);

    impl ProgressObserver for Recorder {
        fn on_progress(&self, completed: usize, total: usize) {
            self.0.lock().unwrap().push((completed, total));
        }
    }

    #[tokio::test]
    async fn test_progress_reports_every_unit() {
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        let p = parallelizer(2, BatchConfig::batched(2), ErrorHandling::Warn).with_progress(recorder.clone());
        let columns = p.column_names(&["id"]).unwrap();
        p.run(rows(5), &columns, Arc::new(Scripted::new(vec![]))).await.unwrap();
        let seen = recorder.0.lock().unwrap().clone();
        assert_eq!(seen, vec![(1, 3), (2, 3), (3, 3)]);
    }
}
