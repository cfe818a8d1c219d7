use serde_json::Value;

use super::entities::{confident, distinct_texts};
use super::{claim_column, ApiFormatter, ResponseReader};
use crate::api::MedicalDetection;
use crate::dataset::{ColumnSchema, ColumnType};
use crate::naming::NameRegistry;
use crate::policy::OutputFormat;
use crate::row::Row;
use crate::Result;

/// `Category` values returned by medical entity detection.
pub const MEDICAL_CATEGORIES: &[&str] = &[
    "ANATOMY",
    "MEDICAL_CONDITION",
    "MEDICATION",
    "PROTECTED_HEALTH_INFORMATION",
    "TEST_TREATMENT_PROCEDURE",
    "TIME_EXPRESSION",
];

/// `Type` values returned by PHI detection.
pub const PHI_TYPES: &[&str] = &[
    "ADDRESS",
    "AGE",
    "EMAIL",
    "ID",
    "NAME",
    "PHONE_OR_FAX",
    "PROFESSION",
    "DATE",
    "URL",
];

pub struct MedicalFormatter {
    reader: ResponseReader,
    output_format: OutputFormat,
    minimum_score: f64,
    /// Entity field grouped on: `Category` for entities, `Type` for PHI.
    group_key: &'static str,
    groups: &'static [&'static str],
    columns: Vec<ColumnSchema>,
}

impl MedicalFormatter {
    pub(crate) fn new(
        reader: ResponseReader,
        detection: MedicalDetection,
        output_format: OutputFormat,
        minimum_score: f64,
        registry: &mut NameRegistry,
    ) -> Result<Self> {
        let (prefix, group_key, groups, label) = match detection {
            MedicalDetection::Entities => ("medical", "Category", MEDICAL_CATEGORIES, "medical entities"),
            MedicalDetection::Phi => ("phi", "Type", PHI_TYPES, "protected health information entities"),
        };
        let columns = match output_format {
            OutputFormat::SingleColumn => vec![claim_column(
                registry,
                &format!("{}_entities", prefix),
                ColumnType::Array,
                format!("List of {} detected by the API", label),
            )?],
            OutputFormat::MultipleColumns => groups
                .iter()
                .map(|g| {
                    claim_column(
                        registry,
                        &format!("{}_{}", prefix, g.to_lowercase()),
                        ColumnType::Array,
                        format!("List of '{}' {} detected by the API", g, label),
                    )
                })
                .collect::<Result<Vec<_>>>()?,
        };
        Ok(Self {
            reader,
            output_format,
            minimum_score,
            group_key,
            groups,
            columns,
        })
    }
}

impl ApiFormatter for MedicalFormatter {
    fn output_columns(&self) -> &[ColumnSchema] {
        &self.columns
    }

    fn format_row(&self, row: &Row) -> Result<Row> {
        let response = self.reader.read(row)?;
        let entities = confident(response.as_ref(), self.minimum_score);

        let mut out = row.clone();
        match self.output_format {
            OutputFormat::SingleColumn => {
                let list = entities.into_iter().cloned().collect();
                out.insert(self.columns[0].name.clone(), Value::Array(list));
            }
            OutputFormat::MultipleColumns => {
                for (group, column) in self.groups.iter().zip(&self.columns) {
                    let texts = distinct_texts(&entities, self.group_key, group);
                    out.insert(column.name.clone(), Value::Array(texts));
                }
            }
        }
        Ok(out)
    }
}
