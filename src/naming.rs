//! Collision-free output column names.

use crate::{Error, Result};

/// Maximum numeric suffix tried before giving up.
pub const MAX_UNIQUE_ATTEMPTS: usize = 999;

/// Returns `name` if it is not in `existing`, otherwise the first of
/// `name_1`, `name_2`, ... `name_999` that is free.
pub fn generate_unique<S: AsRef<str>>(name: &str, existing: &[S]) -> Result<String> {
    let taken = |candidate: &str| existing.iter().any(|e| e.as_ref() == candidate);
    if !taken(name) {
        return Ok(name.to_string());
    }
    for j in 1..=MAX_UNIQUE_ATTEMPTS {
        let candidate = format!("{}_{}", name, j);
        if !taken(&candidate) {
            return Ok(candidate);
        }
    }
    Err(Error::NameGeneration {
        name: name.to_string(),
        attempts: MAX_UNIQUE_ATTEMPTS,
    })
}

/// Generates a unique name and records it, so several derived columns
/// requested in sequence never collide with each other either.
#[derive(Debug, Clone, Default)]
pub struct NameRegistry {
    names: Vec<String>,
}

impl NameRegistry {
    pub fn new<S: AsRef<str>>(existing: &[S]) -> Self {
        Self {
            names: existing.iter().map(|s| s.as_ref().to_string()).collect(),
        }
    }

    pub fn claim(&mut self, name: &str) -> Result<String> {
        let unique = generate_unique(name, &self.names)?;
        self.names.push(unique.clone());
        Ok(unique)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

/// Names of the columns the parallelizer adds to every row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiColumnNames {
    pub response: String,
    pub error_message: String,
    pub error_type: String,
    pub error_raw: String,
}

impl ApiColumnNames {
    /// Builds `{prefix}_response`, `{prefix}_error_message`, `{prefix}_error_type`
    /// and `{prefix}_error_raw`, each made unique against `existing`.
    pub fn new<S: AsRef<str>>(prefix: &str, existing: &[S]) -> Result<Self> {
        let mut registry = NameRegistry::new(existing);
        Ok(Self {
            response: registry.claim(&format!("{}_response", prefix))?,
            error_message: registry.claim(&format!("{}_error_message", prefix))?,
            error_type: registry.claim(&format!("{}_error_type", prefix))?,
            error_raw: registry.claim(&format!("{}_error_raw", prefix))?,
        })
    }

    /// Columns in output order; `error_raw` only when `verbose`.
    pub fn ordered(&self, verbose: bool) -> Vec<&str> {
        let mut cols = vec![
            self.response.as_str(),
            self.error_message.as_str(),
            self.error_type.as_str(),
        ];
        if verbose {
            cols.push(self.error_raw.as_str());
        }
        cols
    }
}
