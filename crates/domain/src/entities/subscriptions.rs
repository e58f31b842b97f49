use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::subscriptions;
use crate::value_objects::enums::{
    subscription_plans::SubscriptionPlan, subscription_statuses::SubscriptionStatus,
};

#[derive(Debug, Clone, Identifiable, Selectable, Queryable, PartialEq)]
#[diesel(table_name = subscriptions)]
pub struct SubscriptionEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan: String,
    pub status: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SubscriptionEntity {
    pub fn status(&self) -> SubscriptionStatus {
        SubscriptionStatus::from_str(&self.status)
    }

    pub fn plan(&self) -> SubscriptionPlan {
        SubscriptionPlan::from_str(&self.plan)
    }

    /// Activity is derived from the validity window, not only from the stored status:
    /// an ACTIVE row whose `end_date` has passed is not active, even before the expiry
    /// sweep flips it.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.status() == SubscriptionStatus::Active && self.end_date > now
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = subscriptions)]
pub struct InsertSubscriptionEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan: String,
    pub status: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
