use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use super::{claim_column, score_of, ApiFormatter, ResponseReader};
use crate::dataset::{ColumnSchema, ColumnType};
use crate::naming::NameRegistry;
use crate::policy::OutputFormat;
use crate::row::Row;
use crate::{Error, ErrorContext, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    CommercialItem,
    Date,
    Event,
    Location,
    Organization,
    Other,
    Person,
    Quantity,
    Title,
}

impl EntityType {
    pub const ALL: [EntityType; 9] = [
        EntityType::CommercialItem,
        EntityType::Date,
        EntityType::Event,
        EntityType::Location,
        EntityType::Organization,
        EntityType::Other,
        EntityType::Person,
        EntityType::Quantity,
        EntityType::Title,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::CommercialItem => "COMMERCIAL_ITEM",
            EntityType::Date => "DATE",
            EntityType::Event => "EVENT",
            EntityType::Location => "LOCATION",
            EntityType::Organization => "ORGANIZATION",
            EntityType::Other => "OTHER",
            EntityType::Person => "PERSON",
            EntityType::Quantity => "QUANTITY",
            EntityType::Title => "TITLE",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let upper = s.trim().to_ascii_uppercase();
        EntityType::ALL
            .into_iter()
            .find(|t| t.as_str() == upper)
            .ok_or_else(|| {
                Error::configuration_with_context(
                    format!("Unknown entity type '{}'", s),
                    ErrorContext::new().with_field_path("entity_types"),
                )
            })
    }
}

/// Texts of `entities` whose `key` field equals `value`, in first-seen order without repeats.
pub(crate) fn distinct_texts<'a>(entities: &[&'a Value], key: &str, value: &str) -> Vec<Value> {
    let mut seen: Vec<&'a str> = Vec::new();
    for entity in entities {
        if entity.get(key).and_then(Value::as_str) != Some(value) {
            continue;
        }
        if let Some(text) = entity.get("Text").and_then(Value::as_str) {
            if !seen.contains(&text) {
                seen.push(text);
            }
        }
    }
    seen.into_iter().map(Value::from).collect()
}

/// Entities at or above `minimum_score`.
pub(crate) fn confident<'a>(response: Option<&'a serde_json::Map<String, Value>>, minimum_score: f64) -> Vec<&'a Value> {
    response
        .and_then(|r| r.get("Entities"))
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter(|e| score_of(e).unwrap_or(0.0) >= minimum_score)
                .collect()
        })
        .unwrap_or_default()
}

pub struct EntitiesFormatter {
    reader: ResponseReader,
    output_format: OutputFormat,
    minimum_score: f64,
    /// Entity type of each column in multiple-column format.
    types: Vec<EntityType>,
    columns: Vec<ColumnSchema>,
}

impl EntitiesFormatter {
    pub(crate) fn new(
        reader: ResponseReader,
        output_format: OutputFormat,
        entity_types: &[EntityType],
        minimum_score: f64,
        registry: &mut NameRegistry,
    ) -> Result<Self> {
        let mut types = Vec::new();
        let columns = match output_format {
            OutputFormat::SingleColumn => vec![claim_column(
                registry,
                "entities",
                ColumnType::Array,
                "List of entities detected by the API",
            )?],
            OutputFormat::MultipleColumns => {
                let mut columns = Vec::with_capacity(entity_types.len());
                for t in entity_types {
                    if types.contains(t) {
                        continue;
                    }
                    types.push(*t);
                    columns.push(claim_column(
                        registry,
                        &format!("entity_type_{}", t.as_str().to_lowercase()),
                        ColumnType::Array,
                        format!("List of '{}' entities detected by the API", t),
                    )?);
                }
                columns
            }
        };
        Ok(Self {
            reader,
            output_format,
            minimum_score,
            types,
            columns,
        })
    }
}

impl ApiFormatter for EntitiesFormatter {
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
                for (t, column) in self.types.iter().zip(&self.columns) {
                    let texts = distinct_texts(&entities, "Type", t.as_str());
                    out.insert(column.name.clone(), Value::Array(texts));
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::ErrorHandling;
    use serde_json::json;

    fn formatter(format: OutputFormat, types: &[EntityType], min: f64) -> EntitiesFormatter {
        let mut registry = NameRegistry::new(&["text", "api_response"]);
        EntitiesFormatter::new(
            ResponseReader::new("api_response", ErrorHandling::Warn),
            format,
            types,
            min,
            &mut registry,
        )
        .unwrap()
    }

    fn row(response: Value) -> Row {
        json!({"text": "t", "api_response": response.to_string()})
            .as_object()
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_person_column() {
        let f = formatter(OutputFormat::MultipleColumns, &EntityType::ALL, 0.5);
        let out = f
            .format_row(&row(json!({"Entities": [{"Type": "PERSON", "Text": "Alice", "Score": 0.99}]})))
            .unwrap();
        assert_eq!(out["entity_type_person"], json!(["Alice"]));
        for t in EntityType::ALL.iter().filter(|t| **t != EntityType::Person) {
            let col = format!("entity_type_{}", t.as_str().to_lowercase());
            assert_eq!(out[&col], json!([]), "{}", col);
        }
        assert_eq!(f.output_columns().len(), 9);
    }

    #[test]
    fn test_dedup_and_minimum_score() {
        let f = formatter(OutputFormat::MultipleColumns, &[EntityType::Location], 0.5);
        let out = f
            .format_row(&row(json!({"Entities": [
                {"Type": "LOCATION", "Text": "Paris", "Score": 0.9},
                {"Type": "LOCATION", "Text": "Lyon", "Score": 0.2},
                {"Type": "LOCATION", "Text": "Nice", "Score": 0.8},
                {"Type": "LOCATION", "Text": "Paris", "Score": 0.95}
            ]})))
            .unwrap();
        assert_eq!(out["entity_type_location"], json!(["Paris", "Nice"]));
        assert!(!out.contains_key("entity_type_person"));
    }

    #[test]
    fn test_single_column_filters_by_score() {
        let f = formatter(OutputFormat::SingleColumn, &EntityType::ALL, 0.5);
        let out = f
            .format_row(&row(json!({"Entities": [
                {"Type": "DATE", "Text": "today", "Score": 0.7},
                {"Type": "TITLE", "Text": "x", "Score": 0.1}
            ]})))
            .unwrap();
        assert_eq!(out["entities"].as_array().unwrap().len(), 1);
        assert_eq!(out["entities"][0]["Text"], "today");
    }

    #[test]
    fn test_parse_entity_type() {
        assert_eq!("commercial_item".parse::<EntityType>().unwrap(), EntityType::CommercialItem);
        assert!("SPACESHIP".parse::<EntityType>().is_err());
    }
}
