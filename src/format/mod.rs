//! 结果格式化模块：将原始 API 响应转换为类型化的输出列。
//!
//! # Result Formatters
//!
//! Each capability has a formatter that reads the raw JSON in the response
//! column and adds typed columns to the row. Column names are resolved once,
//! at construction, against every column already present, so they never
//! collide with input or response/error columns.
//!
//! | Capability | Formatter | Columns (multiple-column format) |
//! |------------|-----------|----------------------------------|
//! | Sentiment | [`SentimentFormatter`] | `predicted_sentiment`, `predicted_probability` |
//! | Key phrases | [`KeyPhrasesFormatter`] | `keyphrase_{n}`, `keyphrase_{n}_score` |
//! | Entities | [`EntitiesFormatter`] | `entity_type_{type}` per selected type |
//! | Language | [`LanguageFormatter`] | `language_code`, `language_score` |
//! | Medical | [`MedicalFormatter`] | `medical_{category}` or `phi_{type}` |
//!
//! A response cell that cannot be parsed is handled per [`ErrorHandling`]:
//! `Warn` logs it and emits default values, `Fail` returns
//! [`Error::MalformedResponse`].

mod entities;
mod key_phrases;
mod language;
mod medical;
mod sentiment;

pub use entities::{EntitiesFormatter, EntityType};
pub use key_phrases::KeyPhrasesFormatter;
pub use language::LanguageFormatter;
pub use medical::{MedicalFormatter, MEDICAL_CATEGORIES, PHI_TYPES};
pub use sentiment::SentimentFormatter;

use serde_json::{Map, Value};
use tracing::warn;

use crate::api::Capability;
use crate::dataset::ColumnSchema;
use crate::naming::NameRegistry;
use crate::policy::{ErrorHandling, OutputFormat};
use crate::row::Row;
use crate::{Error, Result};

/// Turns the raw response of each row into output columns.
pub trait ApiFormatter: Send + Sync {
    /// Columns added by [`ApiFormatter::format_row`], in output order.
    fn output_columns(&self) -> &[ColumnSchema];

    /// Returns `row` with the output columns added.
    fn format_row(&self, row: &Row) -> Result<Row>;

    fn format_rows(&self, rows: &[Row]) -> Result<Vec<Row>> {
        rows.iter().map(|row| self.format_row(row)).collect()
    }
}

/// Reads and parses the response column.
#[derive(Debug, Clone)]
pub(crate) struct ResponseReader {
    column: String,
    error_handling: ErrorHandling,
}

impl ResponseReader {
    pub(crate) fn new(column: impl Into<String>, error_handling: ErrorHandling) -> Self {
        Self {
            column: column.into(),
            error_handling,
        }
    }

    /// The parsed response object; `None` when the row has no response, or
    /// when it is malformed and the policy is `Warn`.
    pub(crate) fn read(&self, row: &Row) -> Result<Option<Map<String, Value>>> {
        let parsed = match row.get(&self.column) {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::String(s)) if s.trim().is_empty() => return Ok(None),
            Some(Value::String(s)) => serde_json::from_str::<Value>(s).map_err(|e| (e.to_string(), s.clone())),
            Some(other) => Ok(other.clone()),
        };
        let result = match parsed {
            Ok(Value::Object(map)) => return Ok(Some(map)),
            Ok(other) => ("response is not a JSON object".to_string(), other.to_string()),
            Err(e) => e,
        };
        let (message, raw) = result;
        match self.error_handling {
            ErrorHandling::Fail => Err(Error::MalformedResponse { message, raw }),
            ErrorHandling::Warn => {
                warn!(column = self.column.as_str(), error = %message, "malformed API response, using defaults");
                Ok(None)
            }
        }
    }
}

/// Claims `name` in `registry` and describes it.
pub(crate) fn claim_column(
    registry: &mut NameRegistry,
    name: &str,
    column_type: crate::dataset::ColumnType,
    description: impl Into<String>,
) -> Result<ColumnSchema> {
    Ok(ColumnSchema::new(registry.claim(name)?, column_type).with_comment(description))
}

pub(crate) fn score_of(item: &Value) -> Option<f64> {
    item.get("Score").and_then(Value::as_f64)
}

/// Options shared by all formatters.
#[derive(Debug, Clone)]
pub struct FormatterOptions {
    pub output_format: OutputFormat,
    pub error_handling: ErrorHandling,
    pub num_key_phrases: usize,
    pub minimum_score: f64,
    pub entity_types: Vec<EntityType>,
}

impl Default for FormatterOptions {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::default(),
            error_handling: ErrorHandling::default(),
            num_key_phrases: 3,
            minimum_score: 0.0,
            entity_types: EntityType::ALL.to_vec(),
        }
    }
}

/// The formatter for `capability`, reading `response_column`.
///
/// `registry` must hold every column already in the rows; the formatter's
/// own columns are claimed in it.
pub fn build_formatter(
    capability: Capability,
    options: &FormatterOptions,
    response_column: &str,
    registry: &mut NameRegistry,
) -> Result<Box<dyn ApiFormatter>> {
    let reader = ResponseReader::new(response_column, options.error_handling);
    Ok(match capability {
        Capability::Sentiment => Box::new(SentimentFormatter::new(reader, registry)?),
        Capability::KeyPhrases => Box::new(KeyPhrasesFormatter::new(
            reader,
            options.output_format,
            options.num_key_phrases,
            registry,
        )?),
        Capability::Entities => Box::new(EntitiesFormatter::new(
            reader,
            options.output_format,
            &options.entity_types,
            options.minimum_score,
            registry,
        )?),
        Capability::LanguageDetection => Box::new(LanguageFormatter::new(reader, registry)?),
        Capability::Medical(detection) => Box::new(MedicalFormatter::new(
            reader,
            detection,
            options.output_format,
            options.minimum_score,
            registry,
        )?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row_with(response: Value) -> Row {
        let mut row = Row::new();
        row.insert("api_response".into(), response);
        row
    }

    #[test]
    fn test_reader_skips_empty_responses() {
        let reader = ResponseReader::new("api_response", ErrorHandling::Fail);
        assert!(reader.read(&row_with("".into())).unwrap().is_none());
        assert!(reader.read(&row_with(Value::Null)).unwrap().is_none());
        assert!(reader.read(&Row::new()).unwrap().is_none());
    }

    #[test]
    fn test_reader_policy_on_malformed() {
        let bad = row_with("{not json".into());
        let fail = ResponseReader::new("api_response", ErrorHandling::Fail);
        assert!(matches!(fail.read(&bad), Err(Error::MalformedResponse { .. })));
        let warn = ResponseReader::new("api_response", ErrorHandling::Warn);
        assert!(warn.read(&bad).unwrap().is_none());
        assert!(fail.read(&row_with("[1]".into())).is_err());
    }

    #[test]
    fn test_reader_accepts_inline_objects() {
        let reader = ResponseReader::new("api_response", ErrorHandling::Fail);
        let parsed = reader.read(&row_with(json!({"Sentiment": "MIXED"}))).unwrap().unwrap();
        assert_eq!(parsed["Sentiment"], "MIXED");
    }

    #[test]
    fn test_build_formatter_avoids_existing_names() {
        let mut registry = NameRegistry::new(&["text", "api_response", "predicted_sentiment"]);
        let f = build_formatter(
            Capability::Sentiment,
            &FormatterOptions::default(),
            "api_response",
            &mut registry,
        )
        .unwrap();
        let names: Vec<&str> = f.output_columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["predicted_sentiment_1", "predicted_probability"]);
    }
}
