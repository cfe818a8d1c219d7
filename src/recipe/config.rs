//! Recipe configuration.
//!
//! Loaded from YAML or JSON, then overridden from the environment:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `COMPREHEND_PARALLEL_WORKERS` | `api_configuration_preset.parallel_workers` |
//! | `COMPREHEND_BATCH_SIZE` | `api_configuration_preset.batch_size` |
//! | `COMPREHEND_QUOTA_RATE_LIMIT` | `api_configuration_preset.api_quota_rate_limit` |
//! | `COMPREHEND_QUOTA_PERIOD_SECS` | `api_configuration_preset.api_quota_period` |
//! | `COMPREHEND_ENDPOINT_URL` | `api_configuration_preset.endpoint_url` |
//! | `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`, `AWS_SESSION_TOKEN` | credentials, when not configured |
//! | `AWS_REGION`, `AWS_DEFAULT_REGION` | `api_configuration_preset.aws_region`, when not configured |

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::api::{Capability, LanguageSource, MedicalDetection};
use crate::batch::{BatchConfig, MAX_BATCH_SIZE};
use crate::format::{EntityType, FormatterOptions};
use crate::parallelizer::ParallelizerConfig;
use crate::policy::{ErrorHandling, OutputFormat};
use crate::resilience::{RateLimiterConfig, RetryConfig, WindowKind};
use crate::transport::{AwsCredentials, HttpClientConfig};
use crate::{Error, ErrorContext, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityKind {
    #[default]
    Sentiment,
    #[serde(alias = "keyphrases", alias = "key_phrase_extraction")]
    KeyPhrases,
    #[serde(alias = "named_entities", alias = "named_entity_recognition")]
    Entities,
    #[serde(alias = "language")]
    LanguageDetection,
    Medical,
}

/// Connection, quota and concurrency settings.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfigurationPreset {
    pub aws_access_key: Option<String>,
    pub aws_secret_key: Option<String>,
    pub aws_session_token: Option<String>,
    pub aws_region: Option<String>,
    pub endpoint_url: Option<String>,
    /// Calls allowed per `api_quota_period`.
    pub api_quota_rate_limit: u32,
    /// Seconds.
    pub api_quota_period: u64,
    pub rate_limit_window: WindowKind,
    pub parallel_workers: usize,
    pub batch_size: usize,
    pub max_attempts: u32,
    pub exponential_backoff: bool,
    pub timeout_secs: Option<u64>,
}

impl Default for ApiConfigurationPreset {
    fn default() -> Self {
        Self {
            aws_access_key: None,
            aws_secret_key: None,
            aws_session_token: None,
            aws_region: None,
            endpoint_url: None,
            api_quota_rate_limit: 25,
            api_quota_period: 1,
            rate_limit_window: WindowKind::Sliding,
            parallel_workers: 4,
            batch_size: 10,
            max_attempts: crate::resilience::retry::DEFAULT_MAX_ATTEMPTS,
            exponential_backoff: false,
            timeout_secs: None,
        }
    }
}

impl std::fmt::Debug for ApiConfigurationPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfigurationPreset")
            .field("aws_access_key", &self.aws_access_key)
            .field("aws_secret_key", &self.aws_secret_key.as_ref().map(|_| "***"))
            .field("aws_session_token", &self.aws_session_token.as_ref().map(|_| "***"))
            .field("aws_region", &self.aws_region)
            .field("endpoint_url", &self.endpoint_url)
            .field("api_quota_rate_limit", &self.api_quota_rate_limit)
            .field("api_quota_period", &self.api_quota_period)
            .field("rate_limit_window", &self.rate_limit_window)
            .field("parallel_workers", &self.parallel_workers)
            .field("batch_size", &self.batch_size)
            .field("max_attempts", &self.max_attempts)
            .field("exponential_backoff", &self.exponential_backoff)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecipeConfig {
    pub capability: CapabilityKind,
    pub text_column: String,
    /// Fixed language code, used unless `language_column` is set.
    pub language: String,
    pub language_column: Option<String>,
    pub output_format: OutputFormat,
    pub error_handling: ErrorHandling,
    pub num_key_phrases: usize,
    pub minimum_score: f64,
    pub entity_types: Vec<EntityType>,
    pub medical_detection_type: MedicalDetection,
    /// Keep the raw JSON response column in the output.
    pub output_raw_response: bool,
    /// Add the raw error detail column.
    pub verbose: bool,
    /// Process and write the input this many rows at a time.
    pub chunk_size: Option<usize>,
    pub output_column_prefix: String,
    pub api_configuration_preset: ApiConfigurationPreset,
}

impl Default for RecipeConfig {
    fn default() -> Self {
        Self {
            capability: CapabilityKind::default(),
            text_column: String::new(),
            language: "en".to_string(),
            language_column: None,
            output_format: OutputFormat::default(),
            error_handling: ErrorHandling::default(),
            num_key_phrases: 3,
            minimum_score: 0.0,
            entity_types: EntityType::ALL.to_vec(),
            medical_detection_type: MedicalDetection::default(),
            output_raw_response: false,
            verbose: false,
            chunk_size: None,
            output_column_prefix: "api".to_string(),
            api_configuration_preset: ApiConfigurationPreset::default(),
        }
    }
}

fn parse_env<T: std::str::FromStr>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    get(key).and_then(|s| s.trim().parse::<T>().ok())
}

impl RecipeConfig {
    pub fn from_yaml_str(s: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(s)?)
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Reads `path` (`.yaml`, `.yml` or `.json`) and applies environment overrides.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let mut config = match ext.as_str() {
            "yaml" | "yml" => Self::from_yaml_str(&content)?,
            "json" => Self::from_json_str(&content)?,
            other => {
                return Err(Error::configuration_with_context(
                    format!("Unsupported configuration format '{}'", other),
                    ErrorContext::new()
                        .with_details(path.display().to_string())
                        .with_source("recipe_config"),
                ))
            }
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Applies overrides looked up through `get`.
    pub fn apply_overrides_from(&mut self, get: impl Fn(&str) -> Option<String>) {
        let preset = &mut self.api_configuration_preset;
        if let Some(v) = parse_env(&get, "COMPREHEND_PARALLEL_WORKERS") {
            preset.parallel_workers = v;
        }
        if let Some(v) = parse_env(&get, "COMPREHEND_BATCH_SIZE") {
            preset.batch_size = v;
        }
        if let Some(v) = parse_env(&get, "COMPREHEND_QUOTA_RATE_LIMIT") {
            preset.api_quota_rate_limit = v;
        }
        if let Some(v) = parse_env(&get, "COMPREHEND_QUOTA_PERIOD_SECS") {
            preset.api_quota_period = v;
        }
        if let Some(v) = get("COMPREHEND_ENDPOINT_URL").filter(|s| !s.trim().is_empty()) {
            preset.endpoint_url = Some(v);
        }
        if preset.aws_access_key.is_none() && preset.aws_secret_key.is_none() {
            preset.aws_access_key = get("AWS_ACCESS_KEY_ID").filter(|s| !s.is_empty());
            preset.aws_secret_key = get("AWS_SECRET_ACCESS_KEY").filter(|s| !s.is_empty());
            if preset.aws_session_token.is_none() {
                preset.aws_session_token = get("AWS_SESSION_TOKEN").filter(|s| !s.is_empty());
            }
        }
        if preset.aws_region.is_none() {
            preset.aws_region = get("AWS_REGION")
                .or_else(|| get("AWS_DEFAULT_REGION"))
                .filter(|s| !s.is_empty());
        }
    }

    /// Checks the configuration against the input columns before any call is made.
    pub fn validate<S: AsRef<str>>(&self, input_columns: &[S]) -> Result<()> {
        let has = |name: &str| input_columns.iter().any(|c| c.as_ref() == name);
        let invalid = |field: &str, msg: String| {
            Err(Error::configuration_with_context(
                msg,
                ErrorContext::new().with_field_path(field).with_source("recipe_config"),
            ))
        };

        if self.text_column.trim().is_empty() {
            return invalid("text_column", "Text column is not set".to_string());
        }
        if !has(&self.text_column) {
            return invalid(
                "text_column",
                format!("Text column '{}' not found in the input dataset", self.text_column),
            );
        }
        if self.capability().needs_language() {
            match &self.language_column {
                Some(col) if !has(col) => {
                    return invalid(
                        "language_column",
                        format!("Language column '{}' not found in the input dataset", col),
                    )
                }
                None if self.language.trim().is_empty() => {
                    return invalid("language", "Language code is empty".to_string())
                }
                _ => {}
            }
        }
        if !(0.0..=1.0).contains(&self.minimum_score) {
            return invalid(
                "minimum_score",
                format!("Minimum score must be between 0 and 1, got {}", self.minimum_score),
            );
        }
        if self.capability == CapabilityKind::KeyPhrases
            && self.output_format == OutputFormat::MultipleColumns
            && self.num_key_phrases == 0
        {
            return invalid("num_key_phrases", "Number of key phrases must be at least 1".to_string());
        }
        if self.chunk_size == Some(0) {
            return invalid("chunk_size", "Chunk size must be at least 1".to_string());
        }
        if self.output_column_prefix.trim().is_empty() {
            return invalid("output_column_prefix", "Output column prefix is empty".to_string());
        }

        let preset = &self.api_configuration_preset;
        if !(1..=MAX_BATCH_SIZE).contains(&preset.batch_size) {
            return invalid(
                "api_configuration_preset.batch_size",
                format!("Batch size must be between 1 and {}, got {}", MAX_BATCH_SIZE, preset.batch_size),
            );
        }
        if preset.parallel_workers == 0 {
            return invalid(
                "api_configuration_preset.parallel_workers",
                "Parallel workers must be at least 1".to_string(),
            );
        }
        if preset.api_quota_rate_limit == 0 {
            return invalid(
                "api_configuration_preset.api_quota_rate_limit",
                "API quota must be at least 1 call".to_string(),
            );
        }
        if preset.api_quota_period == 0 {
            return invalid(
                "api_configuration_preset.api_quota_period",
                "API quota period must be at least 1 second".to_string(),
            );
        }
        if preset.max_attempts == 0 {
            return invalid(
                "api_configuration_preset.max_attempts",
                "Max attempts must be at least 1".to_string(),
            );
        }
        Ok(())
    }

    pub fn capability(&self) -> Capability {
        match self.capability {
            CapabilityKind::Sentiment => Capability::Sentiment,
            CapabilityKind::KeyPhrases => Capability::KeyPhrases,
            CapabilityKind::Entities => Capability::Entities,
            CapabilityKind::LanguageDetection => Capability::LanguageDetection,
            CapabilityKind::Medical => Capability::Medical(self.medical_detection_type),
        }
    }

    pub fn language_source(&self) -> LanguageSource {
        match &self.language_column {
            Some(column) => LanguageSource::Column(column.clone()),
            None => LanguageSource::Fixed(self.language.trim().to_string()),
        }
    }

    /// Batches only when the capability has a batch operation and one language fits all rows.
    pub fn batch_config(&self) -> BatchConfig {
        if self.capability().batch_capable(&self.language_source()) {
            BatchConfig::batched(self.api_configuration_preset.batch_size)
        } else {
            BatchConfig::single_rows()
        }
    }

    pub fn quota_period(&self) -> Duration {
        Duration::from_secs(self.api_configuration_preset.api_quota_period)
    }

    pub fn rate_limiter_config(&self) -> RateLimiterConfig {
        RateLimiterConfig::new(self.api_configuration_preset.api_quota_rate_limit, self.quota_period())
            .with_window(self.api_configuration_preset.rate_limit_window)
    }

    pub fn retry_config(&self) -> RetryConfig {
        let preset = &self.api_configuration_preset;
        let config = RetryConfig::from_period(self.quota_period()).with_max_attempts(preset.max_attempts);
        if preset.exponential_backoff {
            config.with_exponential(self.quota_period() * 8)
        } else {
            config
        }
    }

    pub fn parallelizer_config(&self) -> ParallelizerConfig {
        ParallelizerConfig {
            parallel_workers: self.api_configuration_preset.parallel_workers,
            batch: self.batch_config(),
            error_handling: self.error_handling,
            verbose: self.verbose,
            output_column_prefix: self.output_column_prefix.clone(),
        }
    }

    pub fn formatter_options(&self) -> FormatterOptions {
        FormatterOptions {
            output_format: self.output_format,
            error_handling: self.error_handling,
            num_key_phrases: self.num_key_phrases,
            minimum_score: self.minimum_score,
            entity_types: self.entity_types.clone(),
        }
    }

    /// HTTP client settings; credentials come from the preset, else from the environment.
    pub fn http_client_config(&self) -> Result<HttpClientConfig> {
        let preset = &self.api_configuration_preset;
        let region = preset.aws_region.clone().ok_or_else(|| {
            Error::configuration_with_context(
                "AWS region is not set",
                ErrorContext::new()
                    .with_field_path("api_configuration_preset.aws_region")
                    .with_details("set it in the configuration or through AWS_REGION"),
            )
        })?;
        let mut config = HttpClientConfig::new(region);
        if let Some(endpoint) = &preset.endpoint_url {
            config = config.with_endpoint(endpoint.clone());
        }
        if let Some(secs) = preset.timeout_secs {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        match (&preset.aws_access_key, &preset.aws_secret_key) {
            (Some(id), Some(secret)) => {
                let mut creds = AwsCredentials::new(id.clone(), secret.clone());
                if let Some(token) = &preset.aws_session_token {
                    creds = creds.with_session_token(token.clone());
                }
                config = config.with_credentials(creds);
            }
            (None, None) => {}
            _ => {
                return Err(Error::configuration_with_context(
                    "AWS access key and secret key must be set together",
                    ErrorContext::new().with_field_path("api_configuration_preset.aws_access_key"),
                ))
            }
        }
        Ok(config)
    }
}
