//! 配方运行模块：读取数据集、并行调用 API、格式化结果并写出。
//!
//! # Recipe Runner
//!
//! A [`Recipe`] applies one capability to every row of an input dataset:
//!
//! 1. validate the configuration against the input schema
//! 2. wrap the client in the shared rate limiter and retrier
//! 3. resolve the response, error and formatter column names
//! 4. write the output schema
//! 5. for each chunk (or the whole input): dispatch, reassemble, format, write
//!
//! Rows are written in input order. Under [`ErrorHandling::Fail`](crate::policy::ErrorHandling)
//! the first failed call or batch item stops the run before the failing chunk is written.

pub mod config;

pub use config::{ApiConfigurationPreset, CapabilityKind, RecipeConfig};

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::api::{CapabilityCall, ComprehendApi, RateLimitedApi};
use crate::dataset::{ChunkIter, ColumnSchema, ColumnType, InputDataset, OutputDataset};
use crate::format::build_formatter;
use crate::naming::{ApiColumnNames, NameRegistry};
use crate::parallelizer::{ApiFunction, DataFrameParallelizer, LogProgress, ProgressObserver};
use crate::resilience::{RateLimiter, Retrier};
use crate::row::Row;
use crate::Result;

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub rows: usize,
    /// Rows whose error message column is non-empty.
    pub failed_rows: usize,
    pub elapsed: Duration,
}

pub struct Recipe {
    config: RecipeConfig,
    api: Arc<dyn ComprehendApi>,
    progress: Option<Arc<dyn ProgressObserver>>,
}

impl Recipe {
    pub fn new(config: RecipeConfig, api: Arc<dyn ComprehendApi>) -> Self {
        Self {
            config,
            api,
            progress: None,
        }
    }

    /// Replaces the default progress logging.
    pub fn with_progress(mut self, progress: Arc<dyn ProgressObserver>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn config(&self) -> &RecipeConfig {
        &self.config
    }

    /// Output schema: input columns, the API columns, then the formatter columns.
    fn output_schema(
        &self,
        input: &[ColumnSchema],
        columns: &ApiColumnNames,
        formatted: &[ColumnSchema],
    ) -> Vec<ColumnSchema> {
        let mut schema = input.to_vec();
        if self.config.output_raw_response {
            schema.push(
                ColumnSchema::new(columns.response.clone(), ColumnType::String)
                    .with_comment("Raw response from the API in JSON format"),
            );
        }
        schema.push(
            ColumnSchema::new(columns.error_message.clone(), ColumnType::String)
                .with_comment("Error message from the API"),
        );
        schema.push(
            ColumnSchema::new(columns.error_type.clone(), ColumnType::String)
                .with_comment("Error type from the API"),
        );
        if self.config.verbose {
            schema.push(
                ColumnSchema::new(columns.error_raw.clone(), ColumnType::String)
                    .with_comment("Raw error details from the API"),
            );
        }
        schema.extend(formatted.iter().cloned());
        schema
    }

    pub async fn run<I, O>(&self, input: &I, output: &mut O) -> Result<RunSummary>
    where
        I: InputDataset + ?Sized,
        O: OutputDataset + ?Sized,
    {
        let started = Instant::now();
        let config = &self.config;
        let input_schema = input.read_schema()?;
        let input_columns: Vec<String> = input_schema.iter().map(|c| c.name.clone()).collect();
        config.validate(&input_columns)?;

        let capability = config.capability();
        let limiter = Arc::new(RateLimiter::new(config.rate_limiter_config()));
        let retrier = Retrier::new(config.retry_config());
        let limited: Arc<dyn ComprehendApi> =
            Arc::new(RateLimitedApi::new(Arc::clone(&self.api), Arc::clone(&limiter), retrier));
        let call: Arc<dyn ApiFunction> = Arc::new(CapabilityCall::new(
            capability,
            config.text_column.clone(),
            config.language_source(),
            limited,
        ));

        let progress: Arc<dyn ProgressObserver> = match &self.progress {
            Some(progress) => Arc::clone(progress),
            None => Arc::new(LogProgress::new(capability.operation().name())),
        };
        let parallelizer = DataFrameParallelizer::new(config.parallelizer_config()).with_progress(progress);

        let columns = parallelizer.column_names(&input_columns)?;
        let mut taken = input_columns.clone();
        taken.extend(columns.ordered(true).into_iter().map(str::to_string));
        let mut registry = NameRegistry::new(&taken);
        let formatter = build_formatter(capability, &config.formatter_options(), &columns.response, &mut registry)?;

        let schema = self.output_schema(&input_schema, &columns, formatter.output_columns());
        output.write_schema(&schema)?;

        info!(
            operation = capability.operation().name(),
            text_column = config.text_column.as_str(),
            batched = parallelizer.config().batch.batch_support,
            workers = parallelizer.config().parallel_workers,
            chunk_size = ?config.chunk_size,
            "running recipe"
        );

        let chunks: ChunkIter<'_> = match config.chunk_size {
            Some(size) => input.read_chunks(size)?,
            None => Box::new(std::iter::once(input.read_rows())),
        };

        let mut summary = RunSummary {
            rows: 0,
            failed_rows: 0,
            elapsed: Duration::ZERO,
        };
        for (n, chunk) in chunks.enumerate() {
            let rows = chunk?;
            debug!(chunk = n, rows = rows.len(), "processing chunk");
            let processed = parallelizer.run(rows, &columns, Arc::clone(&call)).await?;
            let formatted = formatter.format_rows(&processed)?;
            for row in formatted {
                summary.rows += 1;
                if is_failed(&row, &columns) {
                    summary.failed_rows += 1;
                }
                if config.output_raw_response {
                    output.write_row(&row)?;
                } else {
                    let row: Row = row.into_iter().filter(|(k, _)| *k != columns.response).collect();
                    output.write_row(&row)?;
                }
            }
            let quota = limiter.snapshot().await;
            debug!(
                chunk = n,
                calls_in_window = quota.in_window,
                quota = quota.calls,
                wait_ms = ?quota.estimated_wait_ms,
                "chunk written"
            );
        }
        output.finish()?;

        summary.elapsed = started.elapsed();
        info!(
            rows = summary.rows,
            failed_rows = summary.failed_rows,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "recipe finished"
        );
        Ok(summary)
    }
}

fn is_failed(row: &Row, columns: &ApiColumnNames) -> bool {
    row.get(&columns.error_message)
        .and_then(|v| v.as_str())
        .is_some_and(|s| !s.is_empty())
}
