use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{payments::PaymentEntity, subscriptions::SubscriptionEntity};
use crate::value_objects::enums::{
    subscription_plans::SubscriptionPlan, subscription_statuses::SubscriptionStatus,
};
use crate::value_objects::quota::{UserUsage, ValidationLimit};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubscriptionModel {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan: SubscriptionPlan,
    pub status: SubscriptionStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<SubscriptionEntity> for SubscriptionModel {
    fn from(value: SubscriptionEntity) -> Self {
        Self {
            plan: value.plan(),
            status: value.status(),
            id: value.id,
            user_id: value.user_id,
            start_date: value.start_date,
            end_date: value.end_date,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentModel {
    pub id: Uuid,
    pub user_id: Uuid,
    pub subscription_id: Option<Uuid>,
    pub amount_minor: i32,
    pub currency: String,
    pub status: String,
    pub method: String,
    pub transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PaymentEntity> for PaymentModel {
    fn from(value: PaymentEntity) -> Self {
        Self {
            id: value.id,
            user_id: value.user_id,
            subscription_id: value.subscription_id,
            amount_minor: value.amount_minor,
            currency: value.currency,
            status: value.status,
            method: value.method,
            transaction_id: value.transaction_id,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SubscriptionStatusDto {
    pub usage: UserUsage,
    pub limit: ValidationLimit,
    pub premium_price_minor: i32,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SubscriptionHistoryDto {
    pub subscriptions: Vec<SubscriptionModel>,
    pub payments: Vec<PaymentModel>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PremiumGrantDto {
    pub subscription: SubscriptionModel,
    pub payment: PaymentModel,
}
