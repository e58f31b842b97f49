use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Stripe,
    Square,
    Manual,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Stripe => "STRIPE",
            PaymentMethod::Square => "SQUARE",
            PaymentMethod::Manual => "MANUAL",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "STRIPE" => Some(PaymentMethod::Stripe),
            "SQUARE" => Some(PaymentMethod::Square),
            "MANUAL" => Some(PaymentMethod::Manual),
            _ => None,
        }
    }
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
