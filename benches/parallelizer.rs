//! Benchmarks for the dispatch path
//!
//! This benchmark measures:
//! - Partitioning rows into dispatch units
//! - Reassembling batch responses into output rows
//! - A full parallelizer run against an instant in-process API

use async_trait::async_trait;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::json;
use std::sync::Arc;

use comprehend_nlp::batch::{partition, ApiResponse, BatchConfig, BatchResponse, DispatchUnit};
use comprehend_nlp::naming::ApiColumnNames;
use comprehend_nlp::parallelizer::{reassemble, ApiFunction, ApiOutcome, DataFrameParallelizer, ParallelizerConfig};
use comprehend_nlp::{Result, Row};

fn sample_rows(n: usize) -> Vec<Row> {
    (0..n)
        .map(|i| {
            json!({"id": i, "text": format!("review number {} was quite positive overall", i)})
                .as_object()
                .cloned()
                .unwrap_or_default()
        })
        .collect()
}

fn batch_outcome(unit: &DispatchUnit) -> ApiOutcome {
    ApiOutcome::Success(ApiResponse::Batch(BatchResponse {
        result_list: (0..unit.len)
            .map(|i| json!({"Index": i, "Sentiment": "POSITIVE", "SentimentScore": {"Positive": 0.97}}))
            .collect(),
        error_list: Vec::new(),
    }))
}

struct InstantApi;

#[async_trait]
impl ApiFunction for InstantApi {
    async fn call_row(&self, _row: &Row) -> Result<String> {
        Ok(r#"{"Sentiment":"NEUTRAL"}"#.to_string())
    }

    async fn call_batch(&self, rows: &[Row]) -> Result<BatchResponse> {
        Ok(BatchResponse {
            result_list: (0..rows.len()).map(|i| json!({"Index": i, "Sentiment": "NEUTRAL"})).collect(),
            error_list: Vec::new(),
        })
    }
}

fn bench_partition(c: &mut Criterion) {
    let mut group = c.benchmark_group("partition");
    for rows in [1_000usize, 100_000] {
        group.throughput(Throughput::Elements(rows as u64));
        group.bench_with_input(BenchmarkId::new("batched_25", rows), &rows, |b, &rows| {
            let config = BatchConfig::batched(25);
            b.iter(|| partition(black_box(rows), &config))
        });
    }
    group.finish();
}

fn bench_reassemble(c: &mut Criterion) {
    let mut group = c.benchmark_group("reassemble");
    for size in [100usize, 10_000] {
        let rows = sample_rows(size);
        let units = partition(size, &BatchConfig::batched(25));
        let columns = ApiColumnNames::new("api", &["id", "text"]).unwrap_or_else(|e| panic!("{e}"));
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("batch_of_25", size), &size, |b, _| {
            b.iter(|| {
                let outcomes = units.iter().rev().map(|u| (*u, batch_outcome(u))).collect();
                reassemble(black_box(&rows), outcomes, &columns, false)
            })
        });
    }
    group.finish();
}

fn bench_parallelizer_run(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap_or_else(|e| panic!("{e}"));
    let rows = sample_rows(1_000);
    let mut group = c.benchmark_group("parallelizer_run");
    group.throughput(Throughput::Elements(rows.len() as u64));
    for (label, batch) in [("single_rows", BatchConfig::single_rows()), ("batched_25", BatchConfig::batched(25))] {
        let parallelizer = DataFrameParallelizer::new(ParallelizerConfig {
            parallel_workers: 8,
            batch,
            ..ParallelizerConfig::default()
        });
        let columns = parallelizer
            .column_names(&["id", "text"])
            .unwrap_or_else(|e| panic!("{e}"));
        let api: Arc<dyn ApiFunction> = Arc::new(InstantApi);
        group.bench_function(label, |b| {
            b.to_async(&rt)
                .iter(|| parallelizer.run(rows.clone(), &columns, Arc::clone(&api)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_partition, bench_reassemble, bench_parallelizer_run);
criterion_main!(benches);
