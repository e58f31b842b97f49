use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What the bridge needs from a provider to open a hosted checkout.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutRequest {
    pub payment_id: Uuid,
    pub user_id: Uuid,
    pub amount_minor: i32,
    pub currency: String,
    pub success_url: String,
    pub cancel_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutSession {
    pub redirect_url: String,
    pub provider_reference: String,
}

/// A raw webhook delivery, exactly as received.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookDelivery {
    pub payload: Vec<u8>,
    pub signature: Option<String>,
}

/// Provider-agnostic meaning of a verified webhook.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderEvent {
    PaymentCompleted {
        payment_id: Uuid,
        transaction_id: Option<String>,
    },
    PaymentFailed {
        payment_id: Uuid,
    },
    Ignored {
        event_type: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckoutModel {
    pub provider: String,
    pub success_url: String,
    pub cancel_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CheckoutSessionDto {
    pub url: String,
    pub payment_id: Uuid,
    pub provider_reference: String,
}
