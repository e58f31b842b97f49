use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use crate::{auth::AuthUser, axum_http::error_responses::AppError};
use application::{errors::UseCaseError, usecases::subscriptions::SubscriptionUseCase};
use domain::value_objects::{enums::payment_methods::PaymentMethod, payments::CheckoutModel};
use infra::postgres::repositories::{payments::PaymentPostgres, subscriptions::SubscriptionPostgres};

use super::phone_validation::Quota;

pub type Subscriptions = SubscriptionUseCase<PaymentPostgres, SubscriptionPostgres>;

#[derive(Clone)]
pub struct SubscriptionRouteState {
    usecase: Arc<Subscriptions>,
    quota_engine: Arc<Quota>,
}

pub fn routes(usecase: Arc<Subscriptions>, quota_engine: Arc<Quota>) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/checkout", post(checkout))
        .route("/create", post(create))
        .route("/history", get(history))
        .with_state(SubscriptionRouteState {
            usecase,
            quota_engine,
        })
}

pub async fn status(
    State(state): State<SubscriptionRouteState>,
    auth: AuthUser,
) -> impl IntoResponse {
    match state.quota_engine.get_status(auth.user_id).await {
        Ok(status) => (StatusCode::OK, Json(status)).into_response(),
        Err(err) => AppError(err).into_response(),
    }
}

pub async fn checkout(
    State(state): State<SubscriptionRouteState>,
    auth: AuthUser,
    Json(model): Json<CheckoutModel>,
) -> impl IntoResponse {
    let Some(method) = PaymentMethod::from_str(&model.provider) else {
        return AppError(UseCaseError::BadRequest(format!(
            "Unsupported payment provider: {}",
            model.provider
        )))
        .into_response();
    };

    match state
        .usecase
        .create_checkout(auth.user_id, method, model.success_url, model.cancel_url)
        .await
    {
        Ok(session) => (StatusCode::OK, Json(session)).into_response(),
        Err(err) => AppError(err).into_response(),
    }
}

pub async fn create(
    State(state): State<SubscriptionRouteState>,
    auth: AuthUser,
) -> impl IntoResponse {
    match state.usecase.grant_manual_premium(auth.user_id).await {
        Ok(grant) => (StatusCode::CREATED, Json(grant)).into_response(),
        Err(err) => AppError(err).into_response(),
    }
}

pub async fn history(
    State(state): State<SubscriptionRouteState>,
    auth: AuthUser,
) -> impl IntoResponse {
    match state.usecase.subscription_history(auth.user_id).await {
        Ok(history) => (StatusCode::OK, Json(history)).into_response(),
        Err(err) => AppError(err).into_response(),
    }
}
