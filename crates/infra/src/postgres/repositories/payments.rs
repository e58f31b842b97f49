use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use diesel::{insert_into, prelude::*, update};
use std::sync::Arc;
use tokio::task;
use uuid::Uuid;

use domain::{
    entities::{
        payments::{NewPaymentEntity, PaymentEntity},
        subscriptions::{InsertSubscriptionEntity, SubscriptionEntity},
    },
    repositories::payments::PaymentRepository,
    schema::{payments, subscriptions},
    value_objects::enums::payment_statuses::PaymentStatus,
};

use crate::postgres::postgres_connection::PgPoolSquad;

pub struct PaymentPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl PaymentPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl PaymentRepository for PaymentPostgres {
    async fn create(&self, new_payment_entity: NewPaymentEntity) -> Result<PaymentEntity> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<PaymentEntity> {
            let mut conn = db_pool.get()?;

            let payment = insert_into(payments::table)
                .values(&new_payment_entity)
                .returning(PaymentEntity::as_select())
                .get_result::<PaymentEntity>(&mut conn)?;

            Ok(payment)
        })
        .await??)
    }

    async fn find_by_id(&self, payment_id: Uuid) -> Result<Option<PaymentEntity>> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Option<PaymentEntity>> {
            let mut conn = db_pool.get()?;

            let payment = payments::table
                .find(payment_id)
                .select(PaymentEntity::as_select())
                .first::<PaymentEntity>(&mut conn)
                .optional()?;

            Ok(payment)
        })
        .await??)
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<PaymentEntity>> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Vec<PaymentEntity>> {
            let mut conn = db_pool.get()?;

            let results = payments::table
                .select(PaymentEntity::as_select())
                .filter(payments::user_id.eq(user_id))
                .order(payments::created_at.desc())
                .load::<PaymentEntity>(&mut conn)?;

            Ok(results)
        })
        .await??)
    }

    async fn set_provider_reference(
        &self,
        payment_id: Uuid,
        provider_reference: String,
    ) -> Result<()> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<()> {
            let mut conn = db_pool.get()?;

            update(payments::table.find(payment_id))
                .set((
                    payments::provider_reference.eq(Some(provider_reference)),
                    payments::updated_at.eq(Utc::now()),
                ))
                .execute(&mut conn)?;

            Ok(())
        })
        .await??)
    }

    async fn mark_completed(
        &self,
        payment_id: Uuid,
        transaction_id: Option<String>,
    ) -> Result<Option<PaymentEntity>> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Option<PaymentEntity>> {
            let mut conn = db_pool.get()?;
            let now = Utc::now();
            let target = payments::table.find(payment_id);

            // A redelivery without a transaction id must not erase the one already stored.
            let payment = match transaction_id {
                Some(transaction_id) => update(target)
                    .set((
                        payments::status.eq(PaymentStatus::Completed.to_string()),
                        payments::transaction_id.eq(Some(transaction_id)),
                        payments::updated_at.eq(now),
                    ))
                    .returning(PaymentEntity::as_select())
                    .get_result::<PaymentEntity>(&mut conn)
                    .optional()?,
                None => update(target)
                    .set((
                        payments::status.eq(PaymentStatus::Completed.to_string()),
                        payments::updated_at.eq(now),
                    ))
                    .returning(PaymentEntity::as_select())
                    .get_result::<PaymentEntity>(&mut conn)
                    .optional()?,
            };

            Ok(payment)
        })
        .await??)
    }

    async fn mark_failed(&self, payment_id: Uuid) -> Result<Option<PaymentEntity>> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Option<PaymentEntity>> {
            let mut conn = db_pool.get()?;

            let payment = update(
                payments::table
                    .filter(payments::id.eq(payment_id))
                    .filter(payments::status.eq(PaymentStatus::Pending.to_string())),
            )
            .set((
                payments::status.eq(PaymentStatus::Failed.to_string()),
                payments::updated_at.eq(Utc::now()),
            ))
            .returning(PaymentEntity::as_select())
            .get_result::<PaymentEntity>(&mut conn)
            .optional()?;

            Ok(payment)
        })
        .await??)
    }

    async fn grant_subscription_if_unlinked(
        &self,
        payment_id: Uuid,
        insert_subscription_entity: InsertSubscriptionEntity,
    ) -> Result<Option<SubscriptionEntity>> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Option<SubscriptionEntity>> {
            let mut conn = db_pool.get()?;

            conn.transaction::<Option<SubscriptionEntity>, anyhow::Error, _>(|conn| {
                let Some(linked) = payments::table
                    .find(payment_id)
                    .select(payments::subscription_id)
                    .for_update()
                    .first::<Option<Uuid>>(conn)
                    .optional()?
                else {
                    return Ok(None);
                };

                if linked.is_some() {
                    return Ok(None);
                }

                let subscription = insert_into(subscriptions::table)
                    .values(&insert_subscription_entity)
                    .returning(SubscriptionEntity::as_select())
                    .get_result::<SubscriptionEntity>(conn)?;

                update(payments::table.find(payment_id))
                    .set((
                        payments::subscription_id.eq(Some(subscription.id)),
                        payments::updated_at.eq(Utc::now()),
                    ))
                    .execute(conn)?;

                Ok(Some(subscription))
            })
        })
        .await??)
    }
}
