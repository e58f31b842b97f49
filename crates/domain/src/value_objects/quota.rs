use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::subscriptions::SubscriptionEntity;
use crate::value_objects::enums::subscription_plans::SubscriptionPlan;

pub const DEFAULT_FREE_TIER_LIMIT: i64 = 5;
pub const DEFAULT_PREMIUM_PRICE_MINOR: i32 = 1999;
pub const DEFAULT_SUBSCRIPTION_DURATION_DAYS: i64 = 30;
pub const FREE_TIER_EXCEEDED_MESSAGE: &str =
    "Free tier limit reached. Please upgrade to continue.";

/// Tunables of the freemium model.
#[derive(Debug, Clone, PartialEq)]
pub struct QuotaPolicy {
    pub free_limit: i64,
    pub premium_price_minor: i32,
    pub currency: String,
    pub subscription_duration_days: i64,
}

impl Default for QuotaPolicy {
    fn default() -> Self {
        Self {
            free_limit: DEFAULT_FREE_TIER_LIMIT,
            premium_price_minor: DEFAULT_PREMIUM_PRICE_MINOR,
            currency: "USD".to_string(),
            subscription_duration_days: DEFAULT_SUBSCRIPTION_DURATION_DAYS,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LimitType {
    Free,
    Premium,
    Exceeded,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationLimit {
    pub can_validate: bool,
    pub remaining_free: i64,
    pub has_active_subscription: bool,
    pub subscription_end_date: Option<DateTime<Utc>>,
    pub limit_type: LimitType,
    pub message: Option<String>,
}

impl ValidationLimit {
    pub fn premium(subscription_end_date: DateTime<Utc>) -> Self {
        Self {
            can_validate: true,
            remaining_free: 0,
            has_active_subscription: true,
            subscription_end_date: Some(subscription_end_date),
            limit_type: LimitType::Premium,
            message: None,
        }
    }

    /// Classifies a user without an active subscription from their recorded usage.
    pub fn from_usage(used: i64, free_limit: i64) -> Self {
        let remaining = (free_limit - used).max(0);

        if remaining > 0 {
            return Self {
                can_validate: true,
                remaining_free: remaining,
                has_active_subscription: false,
                subscription_end_date: None,
                limit_type: LimitType::Free,
                message: None,
            };
        }

        Self {
            can_validate: false,
            remaining_free: 0,
            has_active_subscription: false,
            subscription_end_date: None,
            limit_type: LimitType::Exceeded,
            message: Some(FREE_TIER_EXCEEDED_MESSAGE.to_string()),
        }
    }

    /// All-or-nothing: a free-tier batch larger than the remaining allowance is refused
    /// as a whole.
    pub fn allows_batch(&self, requested: i64) -> bool {
        match self.limit_type {
            LimitType::Premium => true,
            LimitType::Free => requested <= self.remaining_free,
            LimitType::Exceeded => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserUsage {
    pub free_validations_used: i64,
    pub free_validations_remaining: i64,
    pub has_active_subscription: bool,
    pub subscription_end_date: Option<DateTime<Utc>>,
    pub subscription_plan: Option<SubscriptionPlan>,
}

impl UserUsage {
    pub fn new(active: Option<&SubscriptionEntity>, used: i64, free_limit: i64) -> Self {
        match active {
            Some(subscription) => Self {
                free_validations_used: 0,
                free_validations_remaining: free_limit.max(0),
                has_active_subscription: true,
                subscription_end_date: Some(subscription.end_date),
                subscription_plan: Some(subscription.plan()),
            },
            None => Self {
                free_validations_used: used,
                free_validations_remaining: (free_limit - used).max(0),
                has_active_subscription: false,
                subscription_end_date: None,
                subscription_plan: None,
            },
        }
    }
}
