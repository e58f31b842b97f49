use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use domain::value_objects::{
    enums::validation_types::ValidationType, phone_validation::PhoneValidationResult,
};

/// Persists a batch of results and hands back where it was written.
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait ValidationArchive: Send + Sync {
    async fn store(
        &self,
        user_id: Uuid,
        validation_type: ValidationType,
        results: Vec<PhoneValidationResult>,
    ) -> Result<String>;
}
