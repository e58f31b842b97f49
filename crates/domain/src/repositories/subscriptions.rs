use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::entities::subscriptions::{InsertSubscriptionEntity, SubscriptionEntity};

#[async_trait]
#[automock]
pub trait SubscriptionRepository {
    async fn create(
        &self,
        insert_subscription_entity: InsertSubscriptionEntity,
    ) -> Result<SubscriptionEntity>;
    /// Latest-ending ACTIVE row with `end_date > now`.
    async fn find_active_by_user(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<SubscriptionEntity>>;
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<SubscriptionEntity>>;
    /// Flips every ACTIVE row with `end_date <= now` to EXPIRED, returning how many changed.
    async fn expire_ended(&self, now: DateTime<Utc>) -> Result<usize>;
}
