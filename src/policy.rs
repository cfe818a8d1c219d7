//! Closed policy enums consumed by the parallelizer and the formatters.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, ErrorContext};

/// What to do when a call (or a response) fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ErrorHandling {
    /// Abort the whole run on the first unresolved error.
    #[serde(alias = "FAIL")]
    Fail,
    /// Log the error, record it in the error columns and keep going.
    #[default]
    #[serde(alias = "WARN", alias = "log", alias = "LOG")]
    Warn,
}

impl fmt::Display for ErrorHandling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorHandling::Fail => write!(f, "fail"),
            ErrorHandling::Warn => write!(f, "warn"),
        }
    }
}

impl FromStr for ErrorHandling {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail" => Ok(ErrorHandling::Fail),
            "warn" | "log" => Ok(ErrorHandling::Warn),
            other => Err(Error::configuration_with_context(
                format!("Unknown error handling policy '{}'", other),
                ErrorContext::new()
                    .with_field_path("error_handling")
                    .with_details("expected 'fail' or 'warn'"),
            )),
        }
    }
}

/// Shape of the formatted output columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Everything in one JSON column.
    #[serde(alias = "SINGLE_COLUMN")]
    SingleColumn,
    /// One column per item / type.
    #[default]
    #[serde(alias = "MULTIPLE_COLUMNS")]
    MultipleColumns,
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single_column" => Ok(OutputFormat::SingleColumn),
            "multiple_columns" => Ok(OutputFormat::MultipleColumns),
            other => Err(Error::configuration_with_context(
                format!("Unknown output format '{}'", other),
                ErrorContext::new().with_field_path("output_format"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_handling() {
        assert_eq!("FAIL".parse::<ErrorHandling>().unwrap(), ErrorHandling::Fail);
        assert_eq!(" warn ".parse::<ErrorHandling>().unwrap(), ErrorHandling::Warn);
        assert!("ignore".parse::<ErrorHandling>().is_err());
    }

    #[test]
    fn test_serde_accepts_both_cases() {
        let p: ErrorHandling = serde_json::from_str("\"FAIL\"").unwrap();
        assert_eq!(p, ErrorHandling::Fail);
        let f: OutputFormat = serde_json::from_str("\"SINGLE_COLUMN\"").unwrap();
        assert_eq!(f, OutputFormat::SingleColumn);
        let f: OutputFormat = serde_json::from_str("\"multiple_columns\"").unwrap();
        assert_eq!(f, OutputFormat::MultipleColumns);
    }
}
