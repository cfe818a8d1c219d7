//! # comprehend-nlp
//!
//! 使用 Amazon Comprehend 对表格数据集进行并行、限流的自然语言处理。
//!
//! Parallel, rate-limited enrichment of tabular datasets with Amazon Comprehend
//! and Comprehend Medical.
//!
//! ## Overview
//!
//! Every row of an input dataset is sent to one Comprehend capability
//! (sentiment, key phrases, entities, dominant language, medical entities or
//! PHI). Calls are grouped into batches where the service allows it, run on a
//! bounded pool of workers that share one rate limiter, and the responses are
//! reassembled in input order. Each output row carries the raw response, an
//! error message and an error type; a capability-specific formatter then turns
//! the raw response into typed columns.
//!
//! ## Key Features
//!
//! - **Parallel dispatch**: [`parallelizer::DataFrameParallelizer`] runs calls on a bounded worker pool
//! - **Batching**: rows are grouped into batches of up to 25 ([`batch`])
//! - **Resilience**: a shared call quota with retries on throttling ([`resilience`])
//! - **Error policy**: fail fast or record per-row errors ([`policy::ErrorHandling`])
//! - **Collision-free columns**: output names never overwrite input columns ([`naming`])
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use comprehend_nlp::dataset::JsonLinesDataset;
//! use comprehend_nlp::recipe::{Recipe, RecipeConfig};
//! use comprehend_nlp::transport::HttpComprehendClient;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> comprehend_nlp::Result<()> {
//!     let config = RecipeConfig::from_path("recipe.yaml")?;
//!     let client = HttpComprehendClient::new(config.http_client_config()?)?;
//!
//!     let input = JsonLinesDataset::new("reviews.jsonl");
//!     let mut output = JsonLinesDataset::new("reviews_scored.jsonl");
//!     let summary = Recipe::new(config, Arc::new(client)).run(&input, &mut output).await?;
//!     println!("{} rows, {} failed", summary.rows, summary.failed_rows);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`parallelizer`] | Dispatch of API calls and reassembly of results |
//! | [`batch`] | Partitioning rows into dispatch units, batch responses |
//! | [`resilience`] | Rate limiting and retry |
//! | [`api`] | Comprehend operations, capability calls, rate-limited client |
//! | [`transport`] | Signed HTTP client |
//! | [`format`] | Per-capability result formatters |
//! | [`dataset`] | Dataset schema, in-memory and JSON Lines datasets |
//! | [`recipe`] | Configuration and the end-to-end runner |
//! | [`naming`] | Unique column names |
//! | [`policy`] | Error handling and output format policies |

pub mod api;
pub mod batch;
pub mod dataset;
pub mod error_code;
pub mod format;
pub mod naming;
pub mod parallelizer;
pub mod policy;
pub mod recipe;
pub mod resilience;
pub mod row;
pub mod transport;

// Re-export main types for convenience
pub use api::{Capability, ComprehendApi, Operation};
pub use error_code::ComprehendErrorCode;
pub use parallelizer::{ApiFunction, DataFrameParallelizer, ParallelizerConfig};
pub use policy::{ErrorHandling, OutputFormat};
pub use recipe::{Recipe, RecipeConfig, RunSummary};
pub use row::Row;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
