use anyhow::Result;
use async_trait::async_trait;
use diesel::{insert_into, prelude::*};
use std::sync::Arc;
use tokio::task;
use uuid::Uuid;

use domain::{
    entities::user_records::{InsertUserRecordEntity, UserRecordEntity},
    repositories::user_records::UserRecordRepository,
    schema::user_records,
};

use crate::postgres::postgres_connection::PgPoolSquad;

pub struct UserRecordPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl UserRecordPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl UserRecordRepository for UserRecordPostgres {
    async fn create(
        &self,
        insert_user_record_entity: InsertUserRecordEntity,
    ) -> Result<UserRecordEntity> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<UserRecordEntity> {
            let mut conn = db_pool.get()?;

            let record = insert_into(user_records::table)
                .values(&insert_user_record_entity)
                .returning(UserRecordEntity::as_select())
                .get_result::<UserRecordEntity>(&mut conn)?;

            Ok(record)
        })
        .await??)
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<UserRecordEntity>> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Vec<UserRecordEntity>> {
            let mut conn = db_pool.get()?;

            let results = user_records::table
                .select(UserRecordEntity::as_select())
                .filter(user_records::user_id.eq(user_id))
                .order(user_records::created_at.desc())
                .load::<UserRecordEntity>(&mut conn)?;

            Ok(results)
        })
        .await??)
    }
}
