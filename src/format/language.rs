use serde_json::Value;
use std::cmp::Ordering;

use super::{claim_column, score_of, ApiFormatter, ResponseReader};
use crate::dataset::{ColumnSchema, ColumnType};
use crate::naming::NameRegistry;
use crate::row::{round2, Row};
use crate::Result;

pub struct LanguageFormatter {
    reader: ResponseReader,
    columns: Vec<ColumnSchema>,
}

impl LanguageFormatter {
    pub(crate) fn new(reader: ResponseReader, registry: &mut NameRegistry) -> Result<Self> {
        let columns = vec![
            claim_column(
                registry,
                "language_code",
                ColumnType::String,
                "Language code of the dominant language detected by the API",
            )?,
            claim_column(
                registry,
                "language_score",
                ColumnType::Double,
                "Confidence score of the detected language from 0 to 1",
            )?,
        ];
        Ok(Self { reader, columns })
    }
}

impl ApiFormatter for LanguageFormatter {
    fn output_columns(&self) -> &[ColumnSchema] {
        &self.columns
    }

    fn format_row(&self, row: &Row) -> Result<Row> {
        let response = self.reader.read(row)?;
        // First language wins ties.
        let top = response
            .as_ref()
            .and_then(|r| r.get("Languages"))
            .and_then(Value::as_array)
            .and_then(|langs| {
                langs.iter().rev().max_by(|a, b| {
                    let sa = score_of(a).unwrap_or(0.0);
                    let sb = score_of(b).unwrap_or(0.0);
                    sa.partial_cmp(&sb).unwrap_or(Ordering::Equal)
                })
            });

        let code = top
            .and_then(|l| l.get("LanguageCode"))
            .and_then(Value::as_str)
            .unwrap_or_default();
        let score = top
            .and_then(score_of)
            .map(|s| Value::from(round2(s)))
            .unwrap_or(Value::Null);

        let mut out = row.clone();
        out.insert(self.columns[0].name.clone(), Value::String(code.to_string()));
        out.insert(self.columns[1].name.clone(), score);
        Ok(out)
    }
}
