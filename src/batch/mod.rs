//! 批处理模块：将输入行切分为调度单元，并描述批量接口的响应。
//!
//! # Dispatch Unit Module
//!
//! Rows are never sent to the API one by one in bulk; they are first cut into
//! [`DispatchUnit`]s, each of which becomes exactly one concurrent task.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`BatchConfig`] | Whether the target accepts batches, and their size |
//! | [`partition`] | Cuts `n` rows into ordered units covering each row once |
//! | [`DispatchUnit`] | A single row or a contiguous batch of rows |
//! | [`BatchResponse`] | `ResultList` / `ErrorList` returned by batch operations |
//!
//! ## Example
//!
//! ```rust
//! use comprehend_nlp::batch::{partition, BatchConfig};
//!
//! let units = partition(7, &BatchConfig::batched(3));
//! let sizes: Vec<usize> = units.iter().map(|u| u.len).collect();
//! assert_eq!(sizes, vec![3, 3, 1]);
//! ```

mod partition;
mod response;

pub use partition::{partition, BatchConfig, DispatchUnit, UnitKind, MAX_BATCH_SIZE};
pub use response::{ApiResponse, BatchItemError, BatchResponse};
