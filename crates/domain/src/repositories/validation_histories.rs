use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::entities::validation_histories::{
    InsertValidationHistoryEntity, ValidationHistoryEntity,
};

#[async_trait]
#[automock]
pub trait ValidationHistoryRepository {
    async fn create(
        &self,
        insert_validation_history_entity: InsertValidationHistoryEntity,
    ) -> Result<ValidationHistoryEntity>;
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<ValidationHistoryEntity>>;
    /// Zero when the user has no rows.
    async fn sum_total_by_user(&self, user_id: Uuid) -> Result<i64>;
}
