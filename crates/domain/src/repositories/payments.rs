use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::entities::{
    payments::{NewPaymentEntity, PaymentEntity},
    subscriptions::{InsertSubscriptionEntity, SubscriptionEntity},
};

#[async_trait]
#[automock]
pub trait PaymentRepository {
    async fn create(&self, new_payment_entity: NewPaymentEntity) -> Result<PaymentEntity>;
    async fn find_by_id(&self, payment_id: Uuid) -> Result<Option<PaymentEntity>>;
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<PaymentEntity>>;
    async fn set_provider_reference(
        &self,
        payment_id: Uuid,
        provider_reference: String,
    ) -> Result<()>;
    async fn mark_completed(
        &self,
        payment_id: Uuid,
        transaction_id: Option<String>,
    ) -> Result<Option<PaymentEntity>>;
    /// Only a PENDING payment moves to FAILED.
    async fn mark_failed(&self, payment_id: Uuid) -> Result<Option<PaymentEntity>>;
    /// Locks the payment row and, while it has no subscription, inserts the subscription
    /// and links it in one transaction. `None` when another delivery already linked it.
    async fn grant_subscription_if_unlinked(
        &self,
        payment_id: Uuid,
        insert_subscription_entity: InsertSubscriptionEntity,
    ) -> Result<Option<SubscriptionEntity>>;
}
