use std::{collections::HashMap, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use sha2::Sha256;
use tracing::{error, info, warn};
use uuid::Uuid;

use application::interfaces::payment_gateway::{PaymentGateway, WebhookError};
use domain::value_objects::payments::{
    CheckoutRequest, CheckoutSession, ProviderEvent, WebhookDelivery,
};

type HmacSha256 = Hmac<Sha256>;

const STRIPE_API_BASE_URL: &str = "https://api.stripe.com";
pub const DEFAULT_STRIPE_WEBHOOK_TOLERANCE: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
pub struct StripeSettings {
    pub secret_key: String,
    pub webhook_secret: String,
    pub product_name: String,
    /// Oldest signed timestamp still accepted. Zero turns the check off.
    pub webhook_tolerance: Duration,
}

/// Minimal Stripe client built on reqwest: one-off checkout sessions and signed webhooks.
pub struct StripeGateway {
    http: reqwest::Client,
    settings: StripeSettings,
    api_base: String,
}

#[derive(Debug, Deserialize)]
pub struct StripeEvent {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub type_: String,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct StripeCheckoutSession {
    pub id: Option<String>,
    pub payment_intent: Option<String>,
    pub client_reference_id: Option<String>,
    pub metadata: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorDetails,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetails {
    #[serde(rename = "type")]
    type_: Option<String>,
    code: Option<String>,
    message: Option<String>,
}

impl StripeCheckoutSession {
    /// Internal payment id, from metadata first and the client reference second.
    fn payment_id(&self) -> Option<Uuid> {
        self.metadata
            .as_ref()
            .and_then(|metadata| metadata.get("payment_id"))
            .or(self.client_reference_id.as_ref())
            .and_then(|value| Uuid::parse_str(value).ok())
    }
}

impl StripeGateway {
    pub fn new(settings: StripeSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            settings,
            api_base: STRIPE_API_BASE_URL.to_string(),
        }
    }

    async fn ensure_success(resp: reqwest::Response, context: &str) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let request_id = resp
            .headers()
            .get("request-id")
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let body = match resp.text().await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => "<empty response body>".to_string(),
            Err(err) => format!("<failed to read response body: {err}>"),
        };

        let details = serde_json::from_str::<StripeErrorEnvelope>(&body)
            .ok()
            .map(|envelope| envelope.error);

        error!(
            status = %status,
            stripe_request_id = ?request_id,
            stripe_error_type = ?details.as_ref().and_then(|d| d.type_.as_deref()),
            stripe_error_code = ?details.as_ref().and_then(|d| d.code.as_deref()),
            stripe_error_message = ?details.as_ref().and_then(|d| d.message.as_deref()),
            context = %context,
            "stripe api request failed"
        );

        anyhow::bail!(
            "Stripe API request failed: {} (status {}, request_id={:?})",
            context,
            status,
            request_id
        );
    }

    /// Verifies `Stripe-Signature: t=<ts>,v1=<hex>` over `"<ts>.<raw body>"`.
    pub fn verify_webhook_signature(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> std::result::Result<StripeEvent, WebhookError> {
        self.verify_webhook_signature_at(payload, signature_header, Utc::now().timestamp())
    }

    fn verify_webhook_signature_at(
        &self,
        payload: &[u8],
        signature_header: &str,
        now: i64,
    ) -> std::result::Result<StripeEvent, WebhookError> {
        let mut timestamp: Option<&str> = None;
        let mut signatures: Vec<&str> = Vec::new();

        for part in signature_header.split(',') {
            let part = part.trim();
            if let Some(rest) = part.strip_prefix("t=") {
                timestamp = Some(rest);
            } else if let Some(rest) = part.strip_prefix("v1=") {
                signatures.push(rest);
            }
        }

        let timestamp = timestamp.ok_or_else(|| {
            WebhookError::InvalidSignature("missing timestamp in stripe-signature".to_string())
        })?;
        if signatures.is_empty() {
            return Err(WebhookError::InvalidSignature(
                "missing v1 in stripe-signature".to_string(),
            ));
        }

        let matched = signatures.iter().any(|signature| {
            let Ok(provided) = hex::decode(signature) else {
                return false;
            };
            let Ok(mut mac) = HmacSha256::new_from_slice(self.settings.webhook_secret.as_bytes())
            else {
                return false;
            };
            mac.update(timestamp.as_bytes());
            mac.update(b".");
            mac.update(payload);
            mac.verify_slice(&provided).is_ok()
        });

        if !matched {
            return Err(WebhookError::InvalidSignature(
                "stripe signature mismatch".to_string(),
            ));
        }

        let signed_at: i64 = timestamp.parse().map_err(|_| {
            WebhookError::InvalidSignature("unreadable timestamp in stripe-signature".to_string())
        })?;
        let tolerance = i64::try_from(self.settings.webhook_tolerance.as_secs()).unwrap_or(i64::MAX);
        if tolerance > 0 && now.saturating_sub(signed_at) > tolerance {
            warn!(signed_at, now, "stripe_gateway: webhook timestamp outside tolerance");
            return Err(WebhookError::InvalidSignature(
                "stripe-signature timestamp outside tolerance".to_string(),
            ));
        }

        serde_json::from_slice::<StripeEvent>(payload)
            .map_err(|err| WebhookError::Malformed(err.to_string()))
    }

    pub fn provider_event(event: StripeEvent) -> ProviderEvent {
        let handled = matches!(
            event.type_.as_str(),
            "checkout.session.completed" | "checkout.session.expired"
        );
        if !handled {
            return ProviderEvent::Ignored {
                event_type: event.type_,
            };
        }

        let session = serde_json::from_value::<StripeCheckoutSession>(event.data.object).ok();
        let Some(payment_id) = session.as_ref().and_then(StripeCheckoutSession::payment_id) else {
            warn!(
                event_id = ?event.id,
                event_type = %event.type_,
                "stripe webhook: checkout session without payment_id metadata"
            );
            return ProviderEvent::Ignored {
                event_type: event.type_,
            };
        };

        if event.type_ == "checkout.session.expired" {
            return ProviderEvent::PaymentFailed { payment_id };
        }

        ProviderEvent::PaymentCompleted {
            payment_id,
            transaction_id: session.and_then(|session| session.payment_intent),
        }
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_checkout(&self, request: CheckoutRequest) -> Result<CheckoutSession> {
        // https://stripe.com/docs/api/checkout/sessions/create
        let cancel_url = request
            .cancel_url
            .clone()
            .unwrap_or_else(|| request.success_url.clone());
        let body: Vec<(&str, String)> = vec![
            ("mode", "payment".to_string()),
            ("success_url", request.success_url.clone()),
            ("cancel_url", cancel_url),
            ("client_reference_id", request.payment_id.to_string()),
            ("line_items[0][quantity]", "1".to_string()),
            (
                "line_items[0][price_data][currency]",
                request.currency.to_ascii_lowercase(),
            ),
            (
                "line_items[0][price_data][unit_amount]",
                request.amount_minor.to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]",
                self.settings.product_name.clone(),
            ),
            ("metadata[payment_id]", request.payment_id.to_string()),
            ("metadata[user_id]", request.user_id.to_string()),
        ];

        let resp = self
            .http
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .header(AUTHORIZATION, format!("Bearer {}", self.settings.secret_key))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(&body)
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "create checkout session").await?;

        #[derive(Deserialize)]
        struct CheckoutResp {
            id: String,
            url: Option<String>,
        }

        let parsed: CheckoutResp = resp.json().await?;
        let redirect_url = parsed
            .url
            .ok_or_else(|| anyhow::anyhow!("Stripe Checkout session URL is missing"))?;

        info!(payment_id = %request.payment_id, session_id = %parsed.id, "stripe checkout session created");
        Ok(CheckoutSession {
            redirect_url,
            provider_reference: parsed.id,
        })
    }

    async fn parse_webhook(
        &self,
        delivery: WebhookDelivery,
    ) -> std::result::Result<ProviderEvent, WebhookError> {
        let signature = delivery.signature.as_deref().ok_or_else(|| {
            WebhookError::InvalidSignature("missing stripe-signature header".to_string())
        })?;

        let event = self.verify_webhook_signature(&delivery.payload, signature)?;
        Ok(Self::provider_event(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";

    fn gateway() -> StripeGateway {
        StripeGateway::new(StripeSettings {
            secret_key: "sk_test".to_string(),
            webhook_secret: SECRET.to_string(),
            product_name: "Premium Subscription".to_string(),
            webhook_tolerance: DEFAULT_STRIPE_WEBHOOK_TOLERANCE,
        })
    }

    fn sign(timestamp: &str, payload: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(format!("{timestamp}.").as_bytes());
        mac.update(payload);
        format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
    }

    fn completed_payload(payment_id: Uuid) -> Vec<u8> {
        serde_json::json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": { "object": {
                "id": "cs_test_1",
                "payment_intent": "pi_123",
                "metadata": { "payment_id": payment_id.to_string() }
            }}
        })
        .to_string()
        .into_bytes()
    }

    #[tokio::test]
    async fn valid_signature_yields_completion() {
        let payment_id = Uuid::new_v4();
        let payload = completed_payload(payment_id);
        let signature = sign(&Utc::now().timestamp().to_string(), &payload);

        let event = gateway()
            .parse_webhook(WebhookDelivery {
                payload,
                signature: Some(signature),
            })
            .await
            .unwrap();

        assert_eq!(
            event,
            ProviderEvent::PaymentCompleted {
                payment_id,
                transaction_id: Some("pi_123".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn tampered_body_is_rejected() {
        let payload = completed_payload(Uuid::new_v4());
        let signature = sign(&Utc::now().timestamp().to_string(), &payload);
        let tampered = completed_payload(Uuid::new_v4());

        let result = gateway()
            .parse_webhook(WebhookDelivery {
                payload: tampered,
                signature: Some(signature),
            })
            .await;

        assert!(matches!(result, Err(WebhookError::InvalidSignature(_))));
    }

    #[test]
    fn stale_timestamp_is_rejected_even_when_signed() {
        let payload = completed_payload(Uuid::new_v4());
        let signature = sign("1700000000", &payload);
        let gateway = gateway();

        let fresh = gateway.verify_webhook_signature_at(&payload, &signature, 1_700_000_300);
        assert!(fresh.is_ok());

        let replayed = gateway.verify_webhook_signature_at(&payload, &signature, 1_700_000_301);
        assert!(matches!(replayed, Err(WebhookError::InvalidSignature(_))));
    }

    #[test]
    fn zero_tolerance_skips_the_timestamp_check() {
        let payload = completed_payload(Uuid::new_v4());
        let signature = sign("1700000000", &payload);
        let gateway = StripeGateway::new(StripeSettings {
            secret_key: "sk_test".to_string(),
            webhook_secret: SECRET.to_string(),
            product_name: "Premium Subscription".to_string(),
            webhook_tolerance: Duration::ZERO,
        });

        assert!(gateway
            .verify_webhook_signature_at(&payload, &signature, 1_800_000_000)
            .is_ok());
    }

    #[tokio::test]
    async fn missing_header_is_rejected() {
        let result = gateway()
            .parse_webhook(WebhookDelivery {
                payload: completed_payload(Uuid::new_v4()),
                signature: None,
            })
            .await;

        assert!(matches!(result, Err(WebhookError::InvalidSignature(_))));
    }

    #[test]
    fn expired_session_fails_the_payment_and_other_events_are_ignored() {
        let payment_id = Uuid::new_v4();
        let expired: StripeEvent = serde_json::from_value(serde_json::json!({
            "type": "checkout.session.expired",
            "data": { "object": { "client_reference_id": payment_id.to_string() } }
        }))
        .unwrap();
        assert_eq!(
            StripeGateway::provider_event(expired),
            ProviderEvent::PaymentFailed { payment_id }
        );

        let other: StripeEvent = serde_json::from_value(serde_json::json!({
            "type": "invoice.paid",
            "data": { "object": {} }
        }))
        .unwrap();
        assert_eq!(
            StripeGateway::provider_event(other),
            ProviderEvent::Ignored {
                event_type: "invoice.paid".to_string()
            }
        );
    }
}
