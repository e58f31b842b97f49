use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::entities::user_records::{InsertUserRecordEntity, UserRecordEntity};

#[async_trait]
#[automock]
pub trait UserRecordRepository {
    async fn create(
        &self,
        insert_user_record_entity: InsertUserRecordEntity,
    ) -> Result<UserRecordEntity>;
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<UserRecordEntity>>;
}
