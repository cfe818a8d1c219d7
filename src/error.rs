use crate::error_code::ComprehendErrorCode;
use crate::transport::TransportError;
use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ErrorContext {
    /// Field path or configuration key that caused the error (e.g., "text_column", "api_configuration_preset.batch_size")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected range, actual value)
    pub details: Option<String>,
    /// Source of the error (e.g., "recipe_config", "batch_partitioner")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Unified error type for the crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Validation error: {message}{}", format_context(.context))]
    Validation {
        message: String,
        context: ErrorContext,
    },

    #[error("Failed to generate a unique name for '{name}' after {attempts} attempts")]
    NameGeneration { name: String, attempts: usize },

    #[error("Rate limit exceeded: retry in {retry_after_ms} ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("Remote error: {code} (HTTP {status}): {message}")]
    Remote {
        status: u16,
        code: ComprehendErrorCode,
        /// Error type string as reported by the provider (e.g. "ThrottlingException").
        provider_type: String,
        message: String,
    },

    #[error("Malformed API response: {message}")]
    MalformedResponse { message: String, raw: String },

    #[error("Network transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Runtime error: {message}{}", format_context(.context))]
    Runtime {
        message: String,
        context: ErrorContext,
    },
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::configuration_with_context(msg, ErrorContext::new())
    }

    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    /// Create a new validation error with structured context
    pub fn validation_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Validation {
            message: msg.into(),
            context,
        }
    }

    pub fn runtime(msg: impl Into<String>) -> Self {
        Self::runtime_with_context(msg, ErrorContext::new())
    }

    /// Create a new runtime error with structured context
    pub fn runtime_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Runtime {
            message: msg.into(),
            context,
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. }
            | Error::Validation { context, .. }
            | Error::Runtime { context, .. } => Some(context),
            _ => None,
        }
    }

    /// Whether the retrier may try the call again.
    ///
    /// Local limiter denials, provider throttling/server errors and network
    /// failures are transient; everything else (bad input, auth, malformed
    /// payloads) propagates on the first attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::RateLimited { .. } => true,
            Error::Remote { code, .. } => code.retryable(),
            Error::Transport(e) => e.is_transient(),
            Error::Io(_) => true,
            _ => false,
        }
    }

    /// Short classification string written to the error-type output column.
    pub fn error_type(&self) -> String {
        match self {
            Error::Configuration { .. } => "ConfigurationError".to_string(),
            Error::Validation { .. } => "ValidationError".to_string(),
            Error::NameGeneration { .. } => "NameGenerationError".to_string(),
            Error::RateLimited { .. } => "RateLimitException".to_string(),
            Error::Remote { provider_type, .. } => format!("comprehend.{}", provider_type),
            Error::MalformedResponse { .. } => "MalformedResponseError".to_string(),
            Error::Transport(_) => "TransportError".to_string(),
            Error::Io(_) => "IoError".to_string(),
            Error::Serialization(_) => "SerializationError".to_string(),
            Error::Yaml(_) => "YamlError".to_string(),
            Error::Runtime { .. } => "RuntimeError".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_is_rendered_in_message() {
        let err = Error::configuration_with_context(
            "column not found",
            ErrorContext::new()
                .with_field_path("text_column")
                .with_source("recipe_config"),
        );
        assert_eq!(
            err.to_string(),
            "Configuration error: column not found (field: text_column, source: recipe_config)"
        );
        assert!(err.context().is_some());
    }

    #[test]
    fn test_transient_classification() {
        assert!(Error::RateLimited { retry_after_ms: 10 }.is_transient());
        let throttled = Error::Remote {
            status: 400,
            code: ComprehendErrorCode::Throttling,
            provider_type: "ThrottlingException".into(),
            message: "slow down".into(),
        };
        assert!(throttled.is_transient());
        assert_eq!(throttled.error_type(), "comprehend.ThrottlingException");

        let bad_input = Error::Remote {
            status: 400,
            code: ComprehendErrorCode::TextSizeLimitExceeded,
            provider_type: "TextSizeLimitExceededException".into(),
            message: "too long".into(),
        };
        assert!(!bad_input.is_transient());
        assert!(!Error::configuration("x").is_transient());
    }
}
