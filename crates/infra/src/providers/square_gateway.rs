use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;
use tracing::{error, info, warn};
use uuid::Uuid;

use application::interfaces::payment_gateway::{PaymentGateway, WebhookError};
use domain::value_objects::payments::{
    CheckoutRequest, CheckoutSession, ProviderEvent, WebhookDelivery,
};

type HmacSha256 = Hmac<Sha256>;

const SQUARE_API_VERSION: &str = "2024-10-17";
const SQUARE_PRODUCTION_BASE_URL: &str = "https://connect.squareup.com";
const SQUARE_SANDBOX_BASE_URL: &str = "https://connect.squareupsandbox.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SquareEnvironment {
    Production,
    Sandbox,
}

impl SquareEnvironment {
    pub fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" => SquareEnvironment::Production,
            _ => SquareEnvironment::Sandbox,
        }
    }

    fn base_url(&self) -> &'static str {
        match self {
            SquareEnvironment::Production => SQUARE_PRODUCTION_BASE_URL,
            SquareEnvironment::Sandbox => SQUARE_SANDBOX_BASE_URL,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SquareSettings {
    pub access_token: String,
    pub location_id: String,
    pub webhook_signature_key: String,
    /// Public URL Square posts to; part of the signed material.
    pub webhook_url: String,
    pub product_name: String,
    pub environment: SquareEnvironment,
}

pub struct SquareGateway {
    http: reqwest::Client,
    settings: SquareSettings,
}

#[derive(Debug, Deserialize)]
pub struct SquareEvent {
    pub event_id: Option<String>,
    #[serde(rename = "type")]
    pub type_: String,
    pub data: Option<SquareEventData>,
}

#[derive(Debug, Deserialize)]
pub struct SquareEventData {
    pub object: Option<SquareEventObject>,
}

#[derive(Debug, Deserialize)]
pub struct SquareEventObject {
    pub payment: Option<SquarePayment>,
}

#[derive(Debug, Deserialize)]
pub struct SquarePayment {
    pub id: String,
    pub status: Option<String>,
    pub order_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SquareOrderEnvelope {
    order: SquareOrder,
}

#[derive(Debug, Deserialize)]
struct SquareOrder {
    metadata: Option<HashMap<String, String>>,
}

impl SquareGateway {
    pub fn new(settings: SquareSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            settings,
        }
    }

    async fn ensure_success(resp: reqwest::Response, context: &str) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let body = match resp.text().await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => "<empty response body>".to_string(),
            Err(err) => format!("<failed to read response body: {err}>"),
        };

        error!(status = %status, body = %body, context = %context, "square api request failed");
        anyhow::bail!("Square API request failed: {} (status {})", context, status);
    }

    /// `x-square-hmacsha256-signature` is base64 HMAC-SHA256 over `webhook_url + body`.
    pub fn verify_webhook_signature(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> std::result::Result<SquareEvent, WebhookError> {
        let provided = STANDARD.decode(signature.trim()).map_err(|_| {
            WebhookError::InvalidSignature("square signature is not base64".to_string())
        })?;

        let mut mac = HmacSha256::new_from_slice(self.settings.webhook_signature_key.as_bytes())
            .map_err(|err| WebhookError::Provider(anyhow::anyhow!(err.to_string())))?;
        mac.update(self.settings.webhook_url.as_bytes());
        mac.update(payload);
        mac.verify_slice(&provided).map_err(|_| {
            WebhookError::InvalidSignature("square signature mismatch".to_string())
        })?;

        serde_json::from_slice::<SquareEvent>(payload)
            .map_err(|err| WebhookError::Malformed(err.to_string()))
    }

    async fn order_payment_id(&self, order_id: &str) -> Result<Option<Uuid>> {
        let resp = self
            .http
            .get(format!(
                "{}/v2/orders/{}",
                self.settings.environment.base_url(),
                order_id
            ))
            .header(AUTHORIZATION, format!("Bearer {}", self.settings.access_token))
            .header("Square-Version", SQUARE_API_VERSION)
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "retrieve order").await?;
        let envelope: SquareOrderEnvelope = resp.json().await?;

        Ok(envelope
            .order
            .metadata
            .as_ref()
            .and_then(|metadata| metadata.get("payment_id"))
            .and_then(|value| Uuid::parse_str(value).ok()))
    }
}

#[async_trait]
impl PaymentGateway for SquareGateway {
    async fn create_checkout(&self, request: CheckoutRequest) -> Result<CheckoutSession> {
        // https://developer.squareup.com/reference/square/checkout-api/create-payment-link
        let body = json!({
            "idempotency_key": request.payment_id.to_string(),
            "order": {
                "location_id": self.settings.location_id,
                "line_items": [{
                    "name": self.settings.product_name,
                    "quantity": "1",
                    "base_price_money": {
                        "amount": request.amount_minor,
                        "currency": request.currency.to_ascii_uppercase(),
                    },
                }],
                "metadata": {
                    "payment_id": request.payment_id.to_string(),
                    "user_id": request.user_id.to_string(),
                },
            },
            "checkout_options": {
                "redirect_url": request.success_url,
            },
        });

        let resp = self
            .http
            .post(format!(
                "{}/v2/online-checkout/payment-links",
                self.settings.environment.base_url()
            ))
            .header(AUTHORIZATION, format!("Bearer {}", self.settings.access_token))
            .header("Square-Version", SQUARE_API_VERSION)
            .json(&body)
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "create payment link").await?;

        #[derive(Deserialize)]
        struct PaymentLinkResp {
            payment_link: PaymentLink,
        }
        #[derive(Deserialize)]
        struct PaymentLink {
            id: String,
            url: String,
            order_id: Option<String>,
        }

        let parsed: PaymentLinkResp = resp.json().await?;
        let provider_reference = parsed
            .payment_link
            .order_id
            .unwrap_or(parsed.payment_link.id);

        info!(payment_id = %request.payment_id, %provider_reference, "square payment link created");
        Ok(CheckoutSession {
            redirect_url: parsed.payment_link.url,
            provider_reference,
        })
    }

    async fn parse_webhook(
        &self,
        delivery: WebhookDelivery,
    ) -> std::result::Result<ProviderEvent, WebhookError> {
        let signature = delivery.signature.as_deref().ok_or_else(|| {
            WebhookError::InvalidSignature("missing x-square-hmacsha256-signature header".to_string())
        })?;
        let event = self.verify_webhook_signature(&delivery.payload, signature)?;

        if !matches!(event.type_.as_str(), "payment.created" | "payment.updated") {
            return Ok(ProviderEvent::Ignored {
                event_type: event.type_,
            });
        }

        let Some(payment) = event
            .data
            .and_then(|data| data.object)
            .and_then(|object| object.payment)
        else {
            return Err(WebhookError::Malformed(
                "square payment event without payment object".to_string(),
            ));
        };

        let status = payment.status.as_deref().unwrap_or_default();
        if !matches!(status, "COMPLETED" | "FAILED" | "CANCELED") {
            return Ok(ProviderEvent::Ignored {
                event_type: event.type_,
            });
        }

        let Some(order_id) = payment.order_id.as_deref() else {
            warn!(event_id = ?event.event_id, square_payment_id = %payment.id, "square webhook: payment without order");
            return Ok(ProviderEvent::Ignored {
                event_type: event.type_,
            });
        };

        let Some(payment_id) = self.order_payment_id(order_id).await? else {
            warn!(event_id = ?event.event_id, %order_id, "square webhook: order without payment_id metadata");
            return Ok(ProviderEvent::Ignored {
                event_type: event.type_,
            });
        };

        if status == "COMPLETED" {
            Ok(ProviderEvent::PaymentCompleted {
                payment_id,
                transaction_id: Some(payment.id),
            })
        } else {
            Ok(ProviderEvent::PaymentFailed { payment_id })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "square-signature-key";
    const URL: &str = "https://api.example.com/api/v1/webhooks/square";

    fn gateway() -> SquareGateway {
        SquareGateway::new(SquareSettings {
            access_token: "token".to_string(),
            location_id: "LOC".to_string(),
            webhook_signature_key: KEY.to_string(),
            webhook_url: URL.to_string(),
            product_name: "Premium Subscription".to_string(),
            environment: SquareEnvironment::Sandbox,
        })
    }

    fn sign(payload: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(KEY.as_bytes()).unwrap();
        mac.update(URL.as_bytes());
        mac.update(payload);
        STANDARD.encode(mac.finalize().into_bytes())
    }

    #[tokio::test]
    async fn unrelated_event_is_ignored_after_verification() {
        let payload = br#"{"event_id":"e1","type":"refund.created","data":{}}"#.to_vec();
        let signature = sign(&payload);

        let event = gateway()
            .parse_webhook(WebhookDelivery {
                payload,
                signature: Some(signature),
            })
            .await
            .unwrap();

        assert_eq!(
            event,
            ProviderEvent::Ignored {
                event_type: "refund.created".to_string()
            }
        );
    }

    #[tokio::test]
    async fn pending_payment_is_ignored_without_fetching_the_order() {
        let payload = br#"{"type":"payment.created","data":{"object":{"payment":{"id":"p1","status":"APPROVED","order_id":"o1"}}}}"#.to_vec();
        let signature = sign(&payload);

        let event = gateway()
            .parse_webhook(WebhookDelivery {
                payload,
                signature: Some(signature),
            })
            .await
            .unwrap();

        assert!(matches!(event, ProviderEvent::Ignored { .. }));
    }

    #[tokio::test]
    async fn wrong_signature_is_rejected() {
        let payload = br#"{"type":"payment.updated"}"#.to_vec();
        let signature = sign(br#"{"type":"something.else"}"#);

        let result = gateway()
            .parse_webhook(WebhookDelivery {
                payload,
                signature: Some(signature),
            })
            .await;

        assert!(matches!(result, Err(WebhookError::InvalidSignature(_))));
    }

    #[test]
    fn environment_defaults_to_sandbox() {
        assert_eq!(
            SquareEnvironment::from_str("Production"),
            SquareEnvironment::Production
        );
        assert_eq!(SquareEnvironment::from_str(""), SquareEnvironment::Sandbox);
    }
}
