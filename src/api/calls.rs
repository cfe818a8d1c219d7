//! Per-capability request building.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

use super::{ComprehendApi, Operation};
use crate::batch::{BatchItemError, BatchResponse};
use crate::parallelizer::ApiFunction;
use crate::row::{text_cell, Row};
use crate::{Error, ErrorContext, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MedicalDetection {
    #[default]
    #[serde(alias = "ENTITIES", alias = "entity")]
    Entities,
    #[serde(alias = "PHI", alias = "protected_health_information")]
    Phi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Sentiment,
    KeyPhrases,
    Entities,
    LanguageDetection,
    Medical(MedicalDetection),
}

impl Capability {
    pub fn operation(&self) -> Operation {
        match self {
            Capability::Sentiment => Operation::DetectSentiment,
            Capability::KeyPhrases => Operation::DetectKeyPhrases,
            Capability::Entities => Operation::DetectEntities,
            Capability::LanguageDetection => Operation::DetectDominantLanguage,
            Capability::Medical(MedicalDetection::Entities) => Operation::DetectEntitiesV2,
            Capability::Medical(MedicalDetection::Phi) => Operation::DetectPhi,
        }
    }

    pub fn batch_operation(&self) -> Option<Operation> {
        match self {
            Capability::Sentiment => Some(Operation::BatchDetectSentiment),
            Capability::KeyPhrases => Some(Operation::BatchDetectKeyPhrases),
            Capability::Entities => Some(Operation::BatchDetectEntities),
            Capability::LanguageDetection => Some(Operation::BatchDetectDominantLanguage),
            Capability::Medical(_) => None,
        }
    }

    /// Whether requests carry a `LanguageCode`.
    pub fn needs_language(&self) -> bool {
        matches!(
            self,
            Capability::Sentiment | Capability::KeyPhrases | Capability::Entities
        )
    }

    /// Batch calls take one language for the whole list, so a per-row
    /// language column forces single-row calls.
    pub fn batch_capable(&self, language: &LanguageSource) -> bool {
        match self.batch_operation() {
            None => false,
            Some(_) => !self.needs_language() || matches!(language, LanguageSource::Fixed(_)),
        }
    }
}

/// Where the request language comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LanguageSource {
    Fixed(String),
    Column(String),
}

impl Default for LanguageSource {
    fn default() -> Self {
        LanguageSource::Fixed("en".to_string())
    }
}

/// The [`ApiFunction`] of one capability over a text column.
pub struct CapabilityCall {
    capability: Capability,
    text_column: String,
    language: LanguageSource,
    api: Arc<dyn ComprehendApi>,
}

impl CapabilityCall {
    pub fn new(
        capability: Capability,
        text_column: impl Into<String>,
        language: LanguageSource,
        api: Arc<dyn ComprehendApi>,
    ) -> Self {
        Self {
            capability,
            text_column: text_column.into(),
            language,
            api,
        }
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    fn row_language<'a>(&'a self, row: &'a Row) -> Option<&'a str> {
        match &self.language {
            LanguageSource::Fixed(code) => Some(code.as_str()),
            LanguageSource::Column(column) => text_cell(row, column),
        }
    }
}

#[async_trait]
impl ApiFunction for CapabilityCall {
    async fn call_row(&self, row: &Row) -> Result<String> {
        let Some(text) = text_cell(row, &self.text_column) else {
            return Ok(String::new());
        };
        let mut payload = json!({ "Text": text });
        if self.capability.needs_language() {
            let Some(language) = self.row_language(row) else {
                return Ok(String::new());
            };
            payload["LanguageCode"] = Value::String(language.to_string());
        }
        let response = self.api.invoke(self.capability.operation(), payload).await?;
        Ok(serde_json::to_string(&response)?)
    }

    async fn call_batch(&self, rows: &[Row]) -> Result<BatchResponse> {
        let operation = self.capability.batch_operation().ok_or_else(|| {
            Error::runtime_with_context(
                format!("{} has no batch operation", self.capability.operation()),
                ErrorContext::new().with_source("capability_call"),
            )
        })?;

        // Blank texts are answered locally; `sent[k]` is the in-batch
        // position of the k-th submitted text.
        let mut sent = Vec::with_capacity(rows.len());
        let mut texts = Vec::with_capacity(rows.len());
        let mut local_errors = Vec::new();
        for (i, row) in rows.iter().enumerate() {
            match text_cell(row, &self.text_column) {
                Some(text) => {
                    sent.push(i);
                    texts.push(text.to_string());
                }
                None => local_errors.push(BatchItemError {
                    index: i,
                    error_code: "InvalidRequestException".to_string(),
                    error_message: "Text is empty or not a string".to_string(),
                }),
            }
        }
        if texts.is_empty() {
            return Ok(BatchResponse {
                result_list: Vec::new(),
                error_list: local_errors,
            });
        }

        let mut payload = json!({ "TextList": texts });
        if self.capability.needs_language() {
            let LanguageSource::Fixed(code) = &self.language else {
                return Err(Error::configuration_with_context(
                    "Batch calls need a fixed language code",
                    ErrorContext::new()
                        .with_field_path("language")
                        .with_source("capability_call"),
                ));
            };
            payload["LanguageCode"] = Value::String(code.clone());
        }

        let raw = self.api.invoke(operation, payload).await?;
        let mut response = BatchResponse::from_value(raw.clone()).map_err(|e| Error::MalformedResponse {
            message: format!("{} returned an unexpected body: {}", operation, e),
            raw: raw.to_string(),
        })?;

        // Items whose index names no submitted text are dropped, so they
        // cannot land on a row that was answered locally.
        let submitted = sent.len();
        let returned = response.result_list.len() + response.error_list.len();
        response.result_list = response
            .result_list
            .into_iter()
            .filter_map(|mut item| {
                let position = item
                    .get("Index")
                    .and_then(Value::as_u64)
                    .and_then(|k| sent.get(k as usize).copied())?;
                item.as_object_mut()?.insert("Index".to_string(), Value::from(position));
                Some(item)
            })
            .collect();
        response.error_list = response
            .error_list
            .into_iter()
            .filter_map(|mut err| {
                err.index = *sent.get(err.index)?;
                Some(err)
            })
            .collect();
        let dropped = returned - response.result_list.len() - response.error_list.len();
        if dropped > 0 {
            warn!(%operation, submitted, dropped, "batch response items with an unknown Index were ignored");
        }
        response.error_list.extend(local_errors);
        Ok(response)
    }
}
