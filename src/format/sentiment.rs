use serde_json::Value;

use super::{claim_column, ApiFormatter, ResponseReader};
use crate::dataset::{ColumnSchema, ColumnType};
use crate::naming::NameRegistry;
use crate::row::{round2, Row};
use crate::Result;

pub struct SentimentFormatter {
    reader: ResponseReader,
    columns: Vec<ColumnSchema>,
}

impl SentimentFormatter {
    pub(crate) fn new(reader: ResponseReader, registry: &mut NameRegistry) -> Result<Self> {
        let columns = vec![
            claim_column(
                registry,
                "predicted_sentiment",
                ColumnType::String,
                "Sentiment prediction by the API (positive, negative, neutral or mixed)",
            )?,
            claim_column(
                registry,
                "predicted_probability",
                ColumnType::Double,
                "Confidence score of the sentiment prediction from 0 to 1",
            )?,
        ];
        Ok(Self { reader, columns })
    }
}

/// `"positive"` -> `"Positive"`, the key used in `SentimentScore`.
fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl ApiFormatter for SentimentFormatter {
    fn output_columns(&self) -> &[ColumnSchema] {
        &self.columns
    }

    fn format_row(&self, row: &Row) -> Result<Row> {
        let mut label = String::new();
        let mut probability = Value::Null;
        if let Some(response) = self.reader.read(row)? {
            if let Some(sentiment) = response.get("Sentiment").and_then(Value::as_str) {
                label = sentiment.to_lowercase();
                probability = response
                    .get("SentimentScore")
                    .and_then(|scores| scores.get(capitalize(&label)))
                    .and_then(Value::as_f64)
                    .map(|p| Value::from(round2(p)))
                    .unwrap_or(Value::Null);
            }
        }
        let mut out = row.clone();
        out.insert(self.columns[0].name.clone(), Value::String(label));
        out.insert(self.columns[1].name.clone(), probability);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::ErrorHandling;
    use serde_json::json;

    fn formatter() -> SentimentFormatter {
        let mut registry = NameRegistry::new(&["text", "api_response"]);
        SentimentFormatter::new(ResponseReader::new("api_response", ErrorHandling::Warn), &mut registry).unwrap()
    }

    fn row(response: &str) -> Row {
        json!({"text": "t", "api_response": response}).as_object().cloned().unwrap()
    }

    #[test]
    fn test_positive() {
        let raw = r#"{"Sentiment":"POSITIVE","SentimentScore":{"Positive":0.97123,"Negative":0.01,"Neutral":0.01,"Mixed":0.00877}}"#;
        let out = formatter().format_row(&row(raw)).unwrap();
        assert_eq!(out["predicted_sentiment"], "positive");
        assert_eq!(out["predicted_probability"], 0.97);
        assert_eq!(out["text"], "t");
    }

    #[test]
    fn test_idempotent() {
        let f = formatter();
        let input = row(r#"{"Sentiment":"MIXED","SentimentScore":{"Mixed":0.555}}"#);
        let a = f.format_row(&input).unwrap();
        let b = f.format_row(&input).unwrap();
        assert_eq!(a, b);
        assert_eq!(a["predicted_probability"], 0.56);
    }

    #[test]
    fn test_empty_and_malformed_give_defaults() {
        let f = formatter();
        for raw in ["", "oops"] {
            let out = f.format_row(&row(raw)).unwrap();
            assert_eq!(out["predicted_sentiment"], "");
            assert!(out["predicted_probability"].is_null());
        }
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("negative"), "Negative");
        assert_eq!(capitalize(""), "");
    }
}
