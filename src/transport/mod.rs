//! 传输层模块：基于 reqwest 的 AWS JSON 1.1 客户端与 SigV4 签名。
//!
//! # Transport Module
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`http`] | [`HttpComprehendClient`], the reqwest implementation of [`crate::api::ComprehendApi`] |
//! | [`sigv4`] | AWS Signature Version 4 request signing and [`AwsCredentials`] |

pub mod http;
pub mod sigv4;

pub use http::{HttpClientConfig, HttpComprehendClient};
pub use sigv4::AwsCredentials;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request timed out after {0} ms")]
    Timeout(u64),

    #[error("Transport error: {0}")]
    Other(String),
}

impl TransportError {
    /// Connect failures and timeouts may succeed on a later attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            TransportError::Http(e) => e.is_timeout() || e.is_connect(),
            TransportError::Timeout(_) => true,
            TransportError::Other(_) => false,
        }
    }
}
