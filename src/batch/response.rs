//! Responses returned by a dispatch unit's call.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Per-item failure inside a batch response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BatchItemError {
    /// 0-based position of the text in the submitted list.
    pub index: usize,
    #[serde(default)]
    pub error_code: String,
    #[serde(default)]
    pub error_message: String,
}

/// Body of a `BatchDetect*` response.
///
/// Every `ResultList` item carries an `Index` field next to its payload; the
/// index, not the list position, identifies the submitted text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BatchResponse {
    #[serde(default)]
    pub result_list: Vec<Value>,
    #[serde(default)]
    pub error_list: Vec<BatchItemError>,
}

impl BatchResponse {
    pub fn from_value(value: Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }

    /// The result item for in-batch position `index`, if any.
    pub fn result_for(&self, index: usize) -> Option<&Value> {
        self.result_list
            .iter()
            .find(|item| item.get("Index").and_then(Value::as_u64) == Some(index as u64))
    }

    pub fn error_for(&self, index: usize) -> Option<&BatchItemError> {
        self.error_list.iter().find(|e| e.index == index)
    }
}

/// Successful payload of one dispatch unit.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    /// Raw JSON text of a single-row call; empty when the row was not sent.
    Single(String),
    Batch(BatchResponse),
}
