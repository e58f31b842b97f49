use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

use domain::value_objects::payments::{
    CheckoutRequest, CheckoutSession, ProviderEvent, WebhookDelivery,
};

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("{0}")]
    InvalidSignature(String),
    #[error("malformed webhook payload: {0}")]
    Malformed(String),
    #[error(transparent)]
    Provider(#[from] anyhow::Error),
}

#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout(&self, request: CheckoutRequest) -> Result<CheckoutSession>;

    /// Verifies the delivery signature before looking at the payload.
    async fn parse_webhook(
        &self,
        delivery: WebhookDelivery,
    ) -> std::result::Result<ProviderEvent, WebhookError>;
}
