//! Comprehend 错误码：将 AWS 错误类型映射为规范错误码及其重试语义。
//!
//! Canonical error codes for Amazon Comprehend / Comprehend Medical.
//!
//! The provider reports errors as a type string (the `__type` field of the
//! JSON error body, e.g. `"com.amazonaws.comprehend#ThrottlingException"`) and
//! an HTTP status. Batch operations additionally report per-item `ErrorCode`
//! strings inside `ErrorList`. This module folds all of them into one closed
//! enum so the retrier and the error columns agree on what happened.
//!
//! | Category | Codes                                                        |
//! |----------|--------------------------------------------------------------|
//! | client   | InvalidRequest, TextSizeLimitExceeded, UnsupportedLanguage, BatchSizeLimitExceeded, Authentication, AccessDenied |
//! | rate     | Throttling, TooManyRequests                                  |
//! | server   | InternalServer, ServiceUnavailable, Timeout                  |
//! | unknown  | Unknown                                                      |
//!
//! ```rust
//! use comprehend_nlp::error_code::ComprehendErrorCode;
//!
//! let code = ComprehendErrorCode::from_provider_code("com.amazonaws.comprehend#ThrottlingException");
//! assert_eq!(code, ComprehendErrorCode::Throttling);
//! assert!(code.retryable());
//! assert_eq!(code.category(), "rate");
//! ```

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComprehendErrorCode {
    /// Malformed request or invalid parameters
    InvalidRequest,
    /// Text exceeds the per-document size limit
    TextSizeLimitExceeded,
    /// Language code not supported by the operation
    UnsupportedLanguage,
    /// More documents than the batch operation accepts
    BatchSizeLimitExceeded,
    /// Invalid, expired, or missing credentials / signature
    Authentication,
    /// Valid credentials but insufficient permissions
    AccessDenied,
    /// Account-level request throttling
    Throttling,
    /// Per-operation request rate exceeded
    TooManyRequests,
    /// Internal server error on provider side
    InternalServer,
    /// Service temporarily unavailable
    ServiceUnavailable,
    /// Request timed out
    Timeout,
    /// Could not be classified
    Unknown,
}

impl ComprehendErrorCode {
    /// Returns the provider-facing name (e.g., `"ThrottlingException"`).
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "InvalidRequestException",
            Self::TextSizeLimitExceeded => "TextSizeLimitExceededException",
            Self::UnsupportedLanguage => "UnsupportedLanguageException",
            Self::BatchSizeLimitExceeded => "BatchSizeLimitExceededException",
            Self::Authentication => "UnrecognizedClientException",
            Self::AccessDenied => "AccessDeniedException",
            Self::Throttling => "ThrottlingException",
            Self::TooManyRequests => "TooManyRequestsException",
            Self::InternalServer => "InternalServerException",
            Self::ServiceUnavailable => "ServiceUnavailableException",
            Self::Timeout => "RequestTimeout",
            Self::Unknown => "UnknownError",
        }
    }

    /// Returns whether this error is worth retrying with the same payload.
    #[inline]
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            Self::Throttling
                | Self::TooManyRequests
                | Self::InternalServer
                | Self::ServiceUnavailable
                | Self::Timeout
        )
    }

    /// Returns the category: `"client"`, `"rate"`, `"server"`, or `"unknown"`.
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidRequest
            | Self::TextSizeLimitExceeded
            | Self::UnsupportedLanguage
            | Self::BatchSizeLimitExceeded
            | Self::Authentication
            | Self::AccessDenied => "client",
            Self::Throttling | Self::TooManyRequests => "rate",
            Self::InternalServer | Self::ServiceUnavailable | Self::Timeout => "server",
            Self::Unknown => "unknown",
        }
    }

    /// Maps a provider error type string to a code.
    ///
    /// Accepts both the bare name (`"ThrottlingException"`) and the namespaced
    /// form returned in `__type` (`"com.amazonaws.comprehend#ThrottlingException"`).
    pub fn from_provider_code(provider_code: &str) -> Self {
        let bare = provider_code
            .rsplit('#')
            .next()
            .unwrap_or(provider_code)
            .split(':')
            .next()
            .unwrap_or_default()
            .trim();
        match bare {
            "InvalidRequestException" | "ValidationException" | "SerializationException" => {
                Self::InvalidRequest
            }
            "TextSizeLimitExceededException" => Self::TextSizeLimitExceeded,
            "UnsupportedLanguageException" => Self::UnsupportedLanguage,
            "BatchSizeLimitExceededException" => Self::BatchSizeLimitExceeded,
            "UnrecognizedClientException"
            | "InvalidSignatureException"
            | "IncompleteSignature"
            | "MissingAuthenticationToken"
            | "ExpiredTokenException" => Self::Authentication,
            "AccessDeniedException" => Self::AccessDenied,
            "ThrottlingException" | "Throttling" => Self::Throttling,
            "TooManyRequestsException" => Self::TooManyRequests,
            "InternalServerException" | "InternalFailure" => Self::InternalServer,
            "ServiceUnavailableException" | "ServiceUnavailable" => Self::ServiceUnavailable,
            "RequestTimeout" | "RequestTimeoutException" => Self::Timeout,
            _ => Self::Unknown,
        }
    }

    /// Maps an HTTP status code to the most likely code when the body carries no type.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            400 => Self::InvalidRequest,
            401 => Self::Authentication,
            403 => Self::AccessDenied,
            408 => Self::Timeout,
            413 => Self::TextSizeLimitExceeded,
            429 => Self::TooManyRequests,
            500 => Self::InternalServer,
            502 | 503 => Self::ServiceUnavailable,
            504 => Self::Timeout,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for ComprehendErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespaced_type_is_stripped() {
        assert_eq!(
            ComprehendErrorCode::from_provider_code(
                "com.amazonaws.comprehend.v20171127#TextSizeLimitExceededException"
            ),
            ComprehendErrorCode::TextSizeLimitExceeded
        );
        assert_eq!(
            ComprehendErrorCode::from_provider_code("UnrecognizedClientException:http://internal"),
            ComprehendErrorCode::Authentication
        );
    }

    #[test]
    fn test_unknown_codes() {
        assert_eq!(
            ComprehendErrorCode::from_provider_code("SomethingNew"),
            ComprehendErrorCode::Unknown
        );
        assert!(!ComprehendErrorCode::Unknown.retryable());
        assert_eq!(ComprehendErrorCode::from_http_status(418), ComprehendErrorCode::Unknown);
    }

    #[test]
    fn test_retryable_matches_category() {
        for code in [
            ComprehendErrorCode::Throttling,
            ComprehendErrorCode::TooManyRequests,
            ComprehendErrorCode::InternalServer,
            ComprehendErrorCode::ServiceUnavailable,
        ] {
            assert!(code.retryable(), "{code} should be retryable");
            assert_ne!(code.category(), "client");
        }
        for code in [
            ComprehendErrorCode::InvalidRequest,
            ComprehendErrorCode::Authentication,
            ComprehendErrorCode::AccessDenied,
            ComprehendErrorCode::UnsupportedLanguage,
        ] {
            assert!(!code.retryable(), "{code} should not be retryable");
            assert_eq!(code.category(), "client");
        }
    }
}
