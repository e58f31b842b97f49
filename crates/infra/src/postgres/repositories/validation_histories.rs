use anyhow::Result;
use async_trait::async_trait;
use diesel::{dsl::sum, insert_into, prelude::*};
use std::sync::Arc;
use tokio::task;
use uuid::Uuid;

use domain::{
    entities::validation_histories::{InsertValidationHistoryEntity, ValidationHistoryEntity},
    repositories::validation_histories::ValidationHistoryRepository,
    schema::validation_histories,
};

use crate::postgres::postgres_connection::PgPoolSquad;

pub struct ValidationHistoryPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl ValidationHistoryPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl ValidationHistoryRepository for ValidationHistoryPostgres {
    async fn create(
        &self,
        insert_validation_history_entity: InsertValidationHistoryEntity,
    ) -> Result<ValidationHistoryEntity> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<ValidationHistoryEntity> {
            let mut conn = db_pool.get()?;

            let entry = insert_into(validation_histories::table)
                .values(&insert_validation_history_entity)
                .returning(ValidationHistoryEntity::as_select())
                .get_result::<ValidationHistoryEntity>(&mut conn)?;

            Ok(entry)
        })
        .await??)
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<ValidationHistoryEntity>> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Vec<ValidationHistoryEntity>> {
            let mut conn = db_pool.get()?;

            let results = validation_histories::table
                .select(ValidationHistoryEntity::as_select())
                .filter(validation_histories::user_id.eq(user_id))
                .order(validation_histories::created_at.desc())
                .load::<ValidationHistoryEntity>(&mut conn)?;

            Ok(results)
        })
        .await??)
    }

    async fn sum_total_by_user(&self, user_id: Uuid) -> Result<i64> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<i64> {
            let mut conn = db_pool.get()?;

            let total = validation_histories::table
                .filter(validation_histories::user_id.eq(user_id))
                .select(sum(validation_histories::total))
                .first::<Option<i64>>(&mut conn)?;

            Ok(total.unwrap_or(0))
        })
        .await??)
    }
}
