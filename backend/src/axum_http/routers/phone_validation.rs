use std::{sync::Arc, time::Duration};

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use tower_http::timeout::TimeoutLayer;

use crate::{auth::AuthUser, axum_http::error_responses::AppError};
use application::usecases::{phone_validation::PhoneValidationUseCase, quota::QuotaEngine};
use domain::value_objects::phone_validation::{BulkValidationModel, SingleValidationModel};
use infra::{
    postgres::repositories::{
        subscriptions::SubscriptionPostgres, validation_histories::ValidationHistoryPostgres,
    },
    providers::twilio_lookup::TwilioLookupClient,
    storage::local_validation_archive::LocalValidationArchive,
};

pub type PhoneValidation = PhoneValidationUseCase<
    TwilioLookupClient,
    LocalValidationArchive,
    SubscriptionPostgres,
    ValidationHistoryPostgres,
>;
pub type Quota = QuotaEngine<SubscriptionPostgres, ValidationHistoryPostgres>;

#[derive(Clone)]
pub struct PhoneValidationRouteState {
    usecase: Arc<PhoneValidation>,
    quota_engine: Arc<Quota>,
}

pub fn routes(
    usecase: Arc<PhoneValidation>,
    quota_engine: Arc<Quota>,
    request_timeout: Duration,
) -> Router {
    let timed = Router::new()
        .route("/limit", get(limit))
        .route("/single", post(validate_single))
        .route("/history", get(history));
    let untimed = Router::new().route("/bulk", post(validate_bulk));

    with_request_timeout(timed, untimed, request_timeout).with_state(PhoneValidationRouteState {
        usecase,
        quota_engine,
    })
}

/// Bulk validation paces its chunks and then archives and records usage. Once the
/// lookups have been paid for it must run to the end, so it stays outside the timeout.
pub fn with_request_timeout<S>(timed: Router<S>, untimed: Router<S>, timeout: Duration) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    timed.route_layer(TimeoutLayer::new(timeout)).merge(untimed)
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub count: Option<i64>,
}

pub async fn limit(
    State(state): State<PhoneValidationRouteState>,
    auth: AuthUser,
    Query(query): Query<LimitQuery>,
) -> impl IntoResponse {
    let requested = query.count.filter(|count| *count > 0).unwrap_or(1);

    match state.quota_engine.limit_for(auth.user_id, requested).await {
        Ok(limit) => (StatusCode::OK, Json(limit)).into_response(),
        Err(err) => AppError(err).into_response(),
    }
}

pub async fn validate_single(
    State(state): State<PhoneValidationRouteState>,
    auth: AuthUser,
    Json(model): Json<SingleValidationModel>,
) -> impl IntoResponse {
    match state
        .usecase
        .validate_single(auth.user_id, model.phone_number)
        .await
    {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(err) => AppError(err).into_response(),
    }
}

pub async fn validate_bulk(
    State(state): State<PhoneValidationRouteState>,
    auth: AuthUser,
    Json(model): Json<BulkValidationModel>,
) -> impl IntoResponse {
    match state
        .usecase
        .validate_bulk(auth.user_id, model.phone_numbers)
        .await
    {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(err) => AppError(err).into_response(),
    }
}

pub async fn history(
    State(state): State<PhoneValidationRouteState>,
    auth: AuthUser,
) -> impl IntoResponse {
    match state.usecase.history(auth.user_id).await {
        Ok(history) => (StatusCode::OK, Json(history)).into_response(),
        Err(err) => AppError(err).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    async fn slow() -> StatusCode {
        tokio::time::sleep(Duration::from_secs(60)).await;
        StatusCode::OK
    }

    fn app() -> Router {
        with_request_timeout(
            Router::new().route("/single", post(slow)),
            Router::new().route("/bulk", post(slow)),
            Duration::from_secs(30),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn bulk_route_runs_past_the_request_timeout() {
        let resp = app()
            .oneshot(Request::post("/bulk").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test(start_paused = true)]
    async fn other_routes_keep_the_request_timeout() {
        let resp = app()
            .oneshot(Request::post("/single").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::REQUEST_TIMEOUT);
    }
}
