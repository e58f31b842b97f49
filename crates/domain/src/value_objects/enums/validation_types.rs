use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ValidationType {
    Single,
    Bulk,
    Csv,
}

impl ValidationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationType::Single => "single",
            ValidationType::Bulk => "bulk",
            ValidationType::Csv => "csv",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "single" => Some(ValidationType::Single),
            "bulk" => Some(ValidationType::Bulk),
            "csv" => Some(ValidationType::Csv),
            _ => None,
        }
    }

    /// Largest batch accepted in one request of this kind.
    pub fn max_batch(&self) -> usize {
        match self {
            ValidationType::Single => 1,
            ValidationType::Bulk => 1_000,
            ValidationType::Csv => 10_000,
        }
    }
}

impl Display for ValidationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
