//! 数据集模块：表格数据的模式描述、读取与流式写入。
//!
//! # Dataset Module
//!
//! Input and output tables are abstracted behind two small traits so the
//! recipe runner can stream rows from memory, JSON Lines files, or any other
//! store.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`ColumnSchema`] | Column name, type and optional description |
//! | [`InputDataset`] | Schema introspection, full or chunked reads |
//! | [`OutputDataset`] | Schema first, then rows one by one |
//! | [`MemoryDataset`] | In-memory table |
//! | [`JsonLinesDataset`] | One JSON object per line, schema in a `.schema.json` sidecar |

mod jsonl;
mod memory;

pub use jsonl::JsonLinesDataset;
pub use memory::MemoryDataset;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::row::Row;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    String,
    Double,
    Bigint,
    Boolean,
    Array,
    Object,
}

impl ColumnType {
    /// Best guess from a single cell; nulls are strings.
    pub fn infer(value: &Value) -> Self {
        match value {
            Value::Bool(_) => ColumnType::Boolean,
            Value::Number(n) if n.is_i64() || n.is_u64() => ColumnType::Bigint,
            Value::Number(_) => ColumnType::Double,
            Value::Array(_) => ColumnType::Array,
            Value::Object(_) => ColumnType::Object,
            Value::String(_) | Value::Null => ColumnType::String,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl ColumnSchema {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            comment: None,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Schema of `row`'s cells, in row order.
    pub fn infer_all(row: &Row) -> Vec<ColumnSchema> {
        row.iter()
            .map(|(name, value)| ColumnSchema::new(name.clone(), ColumnType::infer(value)))
            .collect()
    }
}

pub type ChunkIter<'a> = Box<dyn Iterator<Item = Result<Vec<Row>>> + 'a>;

pub trait InputDataset {
    fn read_schema(&self) -> Result<Vec<ColumnSchema>>;

    fn read_rows(&self) -> Result<Vec<Row>>;

    /// Rows in order, at most `chunk_size` (minimum 1) per chunk.
    fn read_chunks(&self, chunk_size: usize) -> Result<ChunkIter<'_>>;

    fn column_names(&self) -> Result<Vec<String>> {
        Ok(self.read_schema()?.into_iter().map(|c| c.name).collect())
    }
}

/// Streaming writer: `write_schema` once, then rows, then `finish`.
pub trait OutputDataset {
    fn write_schema(&mut self, schema: &[ColumnSchema]) -> Result<()>;

    fn write_row(&mut self, row: &Row) -> Result<()>;

    fn finish(&mut self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_infer_types() {
        let row = json!({"a": "x", "b": 1, "c": 0.5, "d": true, "e": [1], "f": {}, "g": null});
        let schema = ColumnSchema::infer_all(row.as_object().unwrap());
        let types: Vec<ColumnType> = schema.iter().map(|c| c.column_type).collect();
        assert_eq!(
            types,
            vec![
                ColumnType::String,
                ColumnType::Bigint,
                ColumnType::Double,
                ColumnType::Boolean,
                ColumnType::Array,
                ColumnType::Object,
                ColumnType::String
            ]
        );
        assert_eq!(schema[0].name, "a");
    }

    #[test]
    fn test_schema_serialization() {
        let col = ColumnSchema::new("predicted_sentiment", ColumnType::String).with_comment("label");
        let v = serde_json::to_value(&col).unwrap();
        assert_eq!(v, json!({"name": "predicted_sentiment", "type": "string", "comment": "label"}));
    }
}
