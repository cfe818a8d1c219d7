use serde_json::Value;
use std::cmp::Ordering;

use super::{claim_column, score_of, ApiFormatter, ResponseReader};
use crate::dataset::{ColumnSchema, ColumnType};
use crate::naming::NameRegistry;
use crate::policy::OutputFormat;
use crate::row::{round2, Row};
use crate::Result;

pub struct KeyPhrasesFormatter {
    reader: ResponseReader,
    output_format: OutputFormat,
    columns: Vec<ColumnSchema>,
}

impl KeyPhrasesFormatter {
    pub(crate) fn new(
        reader: ResponseReader,
        output_format: OutputFormat,
        num_key_phrases: usize,
        registry: &mut NameRegistry,
    ) -> Result<Self> {
        let columns = match output_format {
            OutputFormat::SingleColumn => vec![claim_column(
                registry,
                "keyphrase_list",
                ColumnType::Array,
                "List of key phrases with their confidence scores, best first",
            )?],
            OutputFormat::MultipleColumns => {
                let mut columns = Vec::with_capacity(num_key_phrases * 2);
                for n in 0..num_key_phrases {
                    columns.push(claim_column(
                        registry,
                        &format!("keyphrase_{}", n),
                        ColumnType::String,
                        format!("Key phrase ranked {} by confidence", n + 1),
                    )?);
                    columns.push(claim_column(
                        registry,
                        &format!("keyphrase_{}_score", n),
                        ColumnType::Double,
                        format!("Confidence score of key phrase {} from 0 to 1", n + 1),
                    )?);
                }
                columns
            }
        };
        Ok(Self {
            reader,
            output_format,
            columns,
        })
    }
}

/// Key phrases sorted by descending score; unscored items go last.
fn ranked(phrases: &[Value]) -> Vec<&Value> {
    let mut sorted: Vec<&Value> = phrases.iter().collect();
    sorted.sort_by(|a, b| {
        let sa = score_of(a).unwrap_or(f64::NEG_INFINITY);
        let sb = score_of(b).unwrap_or(f64::NEG_INFINITY);
        sb.partial_cmp(&sa).unwrap_or(Ordering::Equal)
    });
    sorted
}

impl ApiFormatter for KeyPhrasesFormatter {
    fn output_columns(&self) -> &[ColumnSchema] {
        &self.columns
    }

    fn format_row(&self, row: &Row) -> Result<Row> {
        let response = self.reader.read(row)?;
        let phrases = response
            .as_ref()
            .and_then(|r| r.get("KeyPhrases"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let ranked = ranked(phrases);

        let mut out = row.clone();
        match self.output_format {
            OutputFormat::SingleColumn => {
                let list = ranked.into_iter().cloned().collect();
                out.insert(self.columns[0].name.clone(), Value::Array(list));
            }
            OutputFormat::MultipleColumns => {
                for (n, pair) in self.columns.chunks(2).enumerate() {
                    let (text, score) = match ranked.get(n) {
                        Some(item) => (
                            item.get("Text").and_then(Value::as_str).unwrap_or_default().to_string(),
                            score_of(item).map(|s| Value::from(round2(s))).unwrap_or(Value::Null),
                        ),
                        None => (String::new(), Value::Null),
                    };
                    out.insert(pair[0].name.clone(), Value::String(text));
                    out.insert(pair[1].name.clone(), score);
                }
            }
        }
        Ok(out)
    }
}
