use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{insert_into, prelude::*, update};
use std::sync::Arc;
use tokio::task;
use uuid::Uuid;

use domain::{
    entities::subscriptions::{InsertSubscriptionEntity, SubscriptionEntity},
    repositories::subscriptions::SubscriptionRepository,
    schema::subscriptions,
    value_objects::enums::subscription_statuses::SubscriptionStatus,
};

use crate::postgres::postgres_connection::PgPoolSquad;

pub struct SubscriptionPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl SubscriptionPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl SubscriptionRepository for SubscriptionPostgres {
    async fn create(
        &self,
        insert_subscription_entity: InsertSubscriptionEntity,
    ) -> Result<SubscriptionEntity> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<SubscriptionEntity> {
            let mut conn = db_pool.get()?;

            let subscription = insert_into(subscriptions::table)
                .values(&insert_subscription_entity)
                .returning(SubscriptionEntity::as_select())
                .get_result::<SubscriptionEntity>(&mut conn)?;

            Ok(subscription)
        })
        .await??)
    }

    async fn find_active_by_user(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<SubscriptionEntity>> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Option<SubscriptionEntity>> {
            let mut conn = db_pool.get()?;

            let subscription = subscriptions::table
                .select(SubscriptionEntity::as_select())
                .filter(subscriptions::user_id.eq(user_id))
                .filter(subscriptions::status.eq(SubscriptionStatus::Active.to_string()))
                .filter(subscriptions::end_date.gt(now))
                .order(subscriptions::end_date.desc())
                .first::<SubscriptionEntity>(&mut conn)
                .optional()?;

            Ok(subscription)
        })
        .await??)
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<SubscriptionEntity>> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Vec<SubscriptionEntity>> {
            let mut conn = db_pool.get()?;

            let results = subscriptions::table
                .select(SubscriptionEntity::as_select())
                .filter(subscriptions::user_id.eq(user_id))
                .order(subscriptions::created_at.desc())
                .load::<SubscriptionEntity>(&mut conn)?;

            Ok(results)
        })
        .await??)
    }

    async fn expire_ended(&self, now: DateTime<Utc>) -> Result<usize> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<usize> {
            let mut conn = db_pool.get()?;

            let expired = update(
                subscriptions::table
                    .filter(subscriptions::status.eq(SubscriptionStatus::Active.to_string()))
                    .filter(subscriptions::end_date.le(now)),
            )
            .set((
                subscriptions::status.eq(SubscriptionStatus::Expired.to_string()),
                subscriptions::updated_at.eq(now),
            ))
            .execute(&mut conn)?;

            Ok(expired)
        })
        .await??)
    }
}
