use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionPlan {
    #[default]
    Free,
    Premium,
}

impl SubscriptionPlan {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionPlan::Free => "FREE",
            SubscriptionPlan::Premium => "PREMIUM",
        }
    }

    pub fn from_str(value: &str) -> Self {
        match value {
            "PREMIUM" => SubscriptionPlan::Premium,
            _ => SubscriptionPlan::Free,
        }
    }
}

impl Display for SubscriptionPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
