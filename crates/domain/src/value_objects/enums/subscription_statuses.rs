use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionStatus {
    #[default]
    Active,
    Expired,
    Cancelled,
    Pending,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "ACTIVE",
            SubscriptionStatus::Expired => "EXPIRED",
            SubscriptionStatus::Cancelled => "CANCELLED",
            SubscriptionStatus::Pending => "PENDING",
        }
    }

    pub fn from_str(value: &str) -> Self {
        match value {
            "ACTIVE" => SubscriptionStatus::Active,
            "EXPIRED" => SubscriptionStatus::Expired,
            "CANCELLED" => SubscriptionStatus::Cancelled,
            "PENDING" => SubscriptionStatus::Pending,
            _ => SubscriptionStatus::Expired,
        }
    }
}

impl Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
