use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{dsl::sql, insert_into, prelude::*, sql_types::Double, update};
use std::sync::Arc;
use tokio::task;
use uuid::Uuid;

use domain::{
    entities::contacts::{ContactEntity, InsertContactEntity},
    repositories::contacts::ContactRepository,
    schema::contacts,
    value_objects::{
        contacts::ContactFilter,
        enums::{contact_phases::ContactPhase, contact_types::ContactType},
    },
};

use crate::postgres::postgres_connection::PgPoolSquad;

pub struct ContactPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl ContactPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl ContactRepository for ContactPostgres {
    async fn create(&self, insert_contact_entity: InsertContactEntity) -> Result<ContactEntity> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<ContactEntity> {
            let mut conn = db_pool.get()?;

            let contact = insert_into(contacts::table)
                .values(&insert_contact_entity)
                .returning(ContactEntity::as_select())
                .get_result::<ContactEntity>(&mut conn)?;

            Ok(contact)
        })
        .await??)
    }

    async fn find_by_id(&self, contact_id: Uuid) -> Result<Option<ContactEntity>> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Option<ContactEntity>> {
            let mut conn = db_pool.get()?;

            let contact = contacts::table
                .find(contact_id)
                .select(ContactEntity::as_select())
                .first::<ContactEntity>(&mut conn)
                .optional()?;

            Ok(contact)
        })
        .await??)
    }

    async fn list(&self, filter: ContactFilter) -> Result<Vec<ContactEntity>> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Vec<ContactEntity>> {
            let mut conn = db_pool.get()?;

            let mut query = contacts::table
                .select(ContactEntity::as_select())
                .into_boxed();

            if let Some(contact_type) = filter.contact_type {
                query = query.filter(contacts::type_.eq(contact_type.to_string()));
            }
            if let Some(phase) = filter.phase {
                query = query.filter(contacts::phase.eq(phase.to_string()));
            }

            let results = query
                .order(contacts::created_at.desc())
                .limit(filter.limit)
                .offset(filter.offset)
                .load::<ContactEntity>(&mut conn)?;

            Ok(results)
        })
        .await??)
    }

    async fn sample_random(
        &self,
        contact_type: ContactType,
        phase: ContactPhase,
    ) -> Result<Option<ContactEntity>> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Option<ContactEntity>> {
            let mut conn = db_pool.get()?;

            let contact = contacts::table
                .select(ContactEntity::as_select())
                .filter(contacts::type_.eq(contact_type.to_string()))
                .filter(contacts::phase.eq(phase.to_string()))
                .order(sql::<Double>("RANDOM()"))
                .first::<ContactEntity>(&mut conn)
                .optional()?;

            Ok(contact)
        })
        .await??)
    }

    async fn transition_phase(
        &self,
        contact_id: Uuid,
        target: ContactPhase,
        now: DateTime<Utc>,
    ) -> Result<Option<ContactEntity>> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Option<ContactEntity>> {
            let mut conn = db_pool.get()?;

            // Row lock so concurrent transitions see each other's delivered_at.
            conn.transaction::<Option<ContactEntity>, anyhow::Error, _>(|conn| {
                let Some(current) = contacts::table
                    .find(contact_id)
                    .select(ContactEntity::as_select())
                    .for_update()
                    .first::<ContactEntity>(conn)
                    .optional()?
                else {
                    return Ok(None);
                };

                let delivered_at = target.delivered_at_after_transition(
                    current.phase(),
                    current.delivered_at,
                    now,
                );

                let updated = update(contacts::table.find(contact_id))
                    .set((
                        contacts::phase.eq(target.to_string()),
                        contacts::updated_at.eq(now),
                        contacts::delivered_at.eq(delivered_at),
                    ))
                    .returning(ContactEntity::as_select())
                    .get_result::<ContactEntity>(conn)?;

                Ok(Some(updated))
            })
        })
        .await??)
    }

    async fn list_delivered_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<ContactEntity>> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Vec<ContactEntity>> {
            let mut conn = db_pool.get()?;

            let results = contacts::table
                .select(ContactEntity::as_select())
                .filter(contacts::phase.eq(ContactPhase::Delivered.to_string()))
                .filter(contacts::delivered_at.lt(cutoff))
                .order(contacts::delivered_at.asc())
                .load::<ContactEntity>(&mut conn)?;

            Ok(results)
        })
        .await??)
    }

    async fn reset_stale_delivery(
        &self,
        contact_id: Uuid,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Option<ContactEntity>> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Option<ContactEntity>> {
            let mut conn = db_pool.get()?;

            let updated = update(
                contacts::table
                    .filter(contacts::id.eq(contact_id))
                    .filter(contacts::phase.eq(ContactPhase::Delivered.to_string()))
                    .filter(contacts::delivered_at.lt(cutoff)),
            )
            .set((
                contacts::phase.eq(ContactPhase::Cleaned.to_string()),
                contacts::updated_at.eq(now),
            ))
            .returning(ContactEntity::as_select())
            .get_result::<ContactEntity>(&mut conn)
            .optional()?;

            Ok(updated)
        })
        .await??)
    }
}
