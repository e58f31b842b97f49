use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info};
use uuid::Uuid;

use domain::{
    entities::validation_histories::InsertValidationHistoryEntity,
    repositories::validation_histories::ValidationHistoryRepository,
    value_objects::{
        enums::validation_types::ValidationType, phone_validation::ValidationHistoryModel,
    },
};

use crate::errors::{UseCaseError, UseCaseResult};

/// Validation consumption is always derived from the stored history rows; nothing is cached.
pub struct UsageLedger<V>
where
    V: ValidationHistoryRepository + Send + Sync + 'static,
{
    validation_history_repo: Arc<V>,
}

impl<V> UsageLedger<V>
where
    V: ValidationHistoryRepository + Send + Sync + 'static,
{
    pub fn new(validation_history_repo: Arc<V>) -> Self {
        Self {
            validation_history_repo,
        }
    }

    pub async fn used_validations(&self, user_id: Uuid) -> UseCaseResult<i64> {
        self.validation_history_repo
            .sum_total_by_user(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "usage_ledger: failed to sum validation usage");
                UseCaseError::Internal(err)
            })
    }

    pub async fn record(
        &self,
        user_id: Uuid,
        validation_type: ValidationType,
        file_path: String,
        total: usize,
    ) -> UseCaseResult<ValidationHistoryModel> {
        let total = i32::try_from(total).map_err(|_| {
            UseCaseError::BadRequest(format!("validation batch of {total} is too large"))
        })?;

        let entry = self
            .validation_history_repo
            .create(InsertValidationHistoryEntity {
                user_id,
                type_: validation_type.to_string(),
                file_path,
                total,
                created_at: Utc::now(),
            })
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    %validation_type,
                    total,
                    db_error = ?err,
                    "usage_ledger: failed to record validation history"
                );
                UseCaseError::Internal(err)
            })?;

        info!(%user_id, %validation_type, total, "usage_ledger: validation recorded");
        Ok(ValidationHistoryModel::from(entry))
    }

    pub async fn history(&self, user_id: Uuid) -> UseCaseResult<Vec<ValidationHistoryModel>> {
        let entries = self
            .validation_history_repo
            .list_by_user(user_id)
            .await
            .map_err(UseCaseError::Internal)?;

        Ok(entries.into_iter().map(ValidationHistoryModel::from).collect())
    }
}
