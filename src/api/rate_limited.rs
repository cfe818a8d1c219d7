//! Rate limiting and retry around an API.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use super::{ComprehendApi, Operation};
use crate::batch::BatchResponse;
use crate::parallelizer::ApiFunction;
use crate::resilience::{RateLimiter, Retrier};
use crate::row::Row;
use crate::Result;

/// Wraps `inner` so every call first takes a slot from the shared limiter,
/// and limiter denials or transient failures are retried.
///
/// Works over a [`ComprehendApi`] client (only requests that actually go out
/// consume quota) or over any [`ApiFunction`].
pub struct RateLimitedApi<A: ?Sized> {
    inner: Arc<A>,
    limiter: Arc<RateLimiter>,
    retrier: Retrier,
}

impl<A: ?Sized> RateLimitedApi<A> {
    pub fn new(inner: Arc<A>, limiter: Arc<RateLimiter>, retrier: Retrier) -> Self {
        Self {
            inner,
            limiter,
            retrier,
        }
    }
}

#[async_trait]
impl<A: ComprehendApi + ?Sized> ComprehendApi for RateLimitedApi<A> {
    async fn invoke(&self, operation: Operation, payload: Value) -> Result<Value> {
        let limiter = &self.limiter;
        let inner = &self.inner;
        let payload = &payload;
        self.retrier
            .run(operation.name(), move || async move {
                limiter.try_acquire().await?;
                inner.invoke(operation, payload.clone()).await
            })
            .await
    }
}

#[async_trait]
impl<A: ApiFunction + ?Sized> ApiFunction for RateLimitedApi<A> {
    async fn call_row(&self, row: &Row) -> Result<String> {
        let limiter = &self.limiter;
        let inner = &self.inner;
        self.retrier
            .run("call_row", move || async move {
                limiter.try_acquire().await?;
                inner.call_row(row).await
            })
            .await
    }

    async fn call_batch(&self, rows: &[Row]) -> Result<BatchResponse> {
        let limiter = &self.limiter;
        let inner = &self.inner;
        self.retrier
            .run("call_batch", move || async move {
                limiter.try_acquire().await?;
                inner.call_batch(rows).await
            })
            .await
    }
}
