use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
};
use serde_json::json;
use tracing::warn;

use crate::axum_http::error_responses::AppError;
use domain::value_objects::{enums::payment_methods::PaymentMethod, payments::WebhookDelivery};

use super::subscriptions::Subscriptions;

const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";
const SQUARE_SIGNATURE_HEADER: &str = "x-square-hmacsha256-signature";

// Providers sign the exact bytes, so handlers take the raw body.
pub fn routes(usecase: Arc<Subscriptions>) -> Router {
    Router::new()
        .route("/stripe", post(stripe))
        .route("/square", post(square))
        .with_state(usecase)
}

pub async fn stripe(
    State(usecase): State<Arc<Subscriptions>>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    handle(usecase, PaymentMethod::Stripe, STRIPE_SIGNATURE_HEADER, headers, body).await
}

pub async fn square(
    State(usecase): State<Arc<Subscriptions>>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    handle(usecase, PaymentMethod::Square, SQUARE_SIGNATURE_HEADER, headers, body).await
}

async fn handle(
    usecase: Arc<Subscriptions>,
    method: PaymentMethod,
    signature_header: &str,
    headers: HeaderMap,
    body: Bytes,
) -> axum::response::Response {
    let signature = signature_from(&headers, signature_header);
    if signature.is_none() {
        warn!(%method, "webhooks: delivery without signature header");
    }

    let delivery = WebhookDelivery {
        payload: body.to_vec(),
        signature,
    };

    match usecase.handle_webhook(method, delivery).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "received": true }))).into_response(),
        Err(err) => AppError(err).into_response(),
    }
}

fn signature_from(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
