use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::post,
};
use chrono::Utc;
use tracing::error;

use crate::{
    config::config_model::DotEnvyConfig,
    usecases::{
        contact_retention::ContactRetentionUseCase, subscription_expiry::SubscriptionExpiryUseCase,
    },
};

// Run example
//   curl -X POST "http://localhost:$SERVER_PORT_WORKER/internal/v1/sweeps/contacts" \
//     -H "Authorization: Bearer $INTERNAL_SWEEP_TOKEN"

#[derive(Clone)]
pub struct SweepRouteState {
    config: Arc<DotEnvyConfig>,
    contact_retention: Arc<ContactRetentionUseCase>,
    subscription_expiry: Arc<SubscriptionExpiryUseCase>,
}

pub fn routes(
    config: Arc<DotEnvyConfig>,
    contact_retention: Arc<ContactRetentionUseCase>,
    subscription_expiry: Arc<SubscriptionExpiryUseCase>,
) -> Router {
    Router::new()
        .route("/contacts", post(sweep_contacts))
        .route("/subscriptions", post(sweep_subscriptions))
        .with_state(SweepRouteState {
            config,
            contact_retention,
            subscription_expiry,
        })
}

pub async fn sweep_contacts(State(state): State<SweepRouteState>, headers: HeaderMap) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }

    match state.contact_retention.run(Utc::now()).await {
        Ok(report) => Json(report).into_response(),
        Err(err) => {
            error!(error = ?err, "contact_retention: manual sweep failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "sweep failed").into_response()
        }
    }
}

pub async fn sweep_subscriptions(
    State(state): State<SweepRouteState>,
    headers: HeaderMap,
) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }

    match state.subscription_expiry.run(Utc::now()).await {
        Ok(report) => Json(report).into_response(),
        Err(err) => {
            error!(error = ?err, "subscription_expiry: manual sweep failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "sweep failed").into_response()
        }
    }
}

fn authorize(state: &SweepRouteState, headers: &HeaderMap) -> Result<(), Response> {
    let Some(expected_token) = state.config.sweeps.internal_token.as_deref() else {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            "sweep token is not configured",
        )
            .into_response());
    };

    authorize_bearer(headers, expected_token)
        .map_err(|status| (status, "unauthorized").into_response())
}

fn authorize_bearer(headers: &HeaderMap, expected_token: &str) -> Result<(), StatusCode> {
    let auth = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = auth
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?;

    if token == expected_token {
        Ok(())
    } else {
        Err(StatusCode::UNAUTHORIZED)
    }
}
