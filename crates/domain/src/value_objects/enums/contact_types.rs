use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ContactType {
    B2B,
    B2C,
}

impl ContactType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactType::B2B => "B2B",
            ContactType::B2C => "B2C",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "B2B" => Some(ContactType::B2B),
            "B2C" => Some(ContactType::B2C),
            _ => None,
        }
    }
}

impl Display for ContactType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
