//! 弹性模式模块：提供限流器和重试器。
//!
//! # Resilience Primitives Module
//!
//! Outbound Comprehend calls are capped and retried by two explicitly
//! constructed objects, composed around the API function by
//! [`crate::api::RateLimitedApi`]:
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`rate_limiter`] | Sliding or fixed window call cap shared by all workers |
//! | [`retry`] | Bounded retry loop for limiter denials and transient provider/network errors |
//!
//! ## Rate Limiter
//!
//! ```rust
//! use comprehend_nlp::resilience::rate_limiter::{RateLimiter, RateLimiterConfig, WindowKind};
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let config = RateLimiterConfig::new(2, Duration::from_secs(1)).with_window(WindowKind::Sliding);
//! let limiter = RateLimiter::new(config);
//!
//! assert!(limiter.try_acquire().await.is_ok());
//! assert!(limiter.try_acquire().await.is_ok());
//! assert!(limiter.try_acquire().await.is_err());
//! # });
//! ```

pub mod rate_limiter;
pub mod retry;

pub use rate_limiter::{RateLimiter, RateLimiterConfig, RateLimiterSnapshot, WindowKind};
pub use retry::{Retrier, RetryConfig};
