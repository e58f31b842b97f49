use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{auth::AuthUser, axum_http::error_responses::AppError};
use application::{errors::UseCaseError, usecases::contacts::ContactUseCase};
use domain::{
    repositories::{contacts::ContactRepository, user_records::UserRecordRepository},
    value_objects::{
        contacts::{ContactFilter, InsertContactModel, StoreRecordModel, UpdatePhaseModel},
        enums::{contact_phases::ContactPhase, contact_types::ContactType},
    },
};
use infra::postgres::{
    postgres_connection::PgPoolSquad,
    repositories::{contacts::ContactPostgres, user_records::UserRecordPostgres},
};

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let contact_repository = ContactPostgres::new(Arc::clone(&db_pool));
    let user_record_repository = UserRecordPostgres::new(Arc::clone(&db_pool));
    let contact_usecase =
        ContactUseCase::new(Arc::new(contact_repository), Arc::new(user_record_repository));

    Router::new()
        .route("/", post(create).get(list))
        .route("/random", get(random))
        .route("/:id/phase", put(transition_phase))
        .route("/records", post(store_record))
        .route("/records/my", get(my_records))
        .route("/my-leads", get(my_leads))
        .with_state(Arc::new(contact_usecase))
}

#[derive(Debug, Deserialize)]
pub struct RandomContactQuery {
    #[serde(rename = "type")]
    pub contact_type: ContactType,
    pub phase: Option<ContactPhase>,
}

#[derive(Debug, Deserialize)]
pub struct ListContactsQuery {
    #[serde(rename = "type")]
    pub contact_type: Option<ContactType>,
    pub phase: Option<ContactPhase>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn random<C, U>(
    State(contact_usecase): State<Arc<ContactUseCase<C, U>>>,
    _auth: AuthUser,
    Query(query): Query<RandomContactQuery>,
) -> impl IntoResponse
where
    C: ContactRepository + Send + Sync + 'static,
    U: UserRecordRepository + Send + Sync + 'static,
{
    let phase = query.phase.unwrap_or(ContactPhase::Cleaned);

    match contact_usecase.sample_random(query.contact_type, phase).await {
        Ok(Some(contact)) => (StatusCode::OK, Json(contact)).into_response(),
        Ok(None) => AppError(UseCaseError::NotFound(format!(
            "No {} contact in phase {}",
            query.contact_type, phase
        )))
        .into_response(),
        Err(err) => AppError(err).into_response(),
    }
}

pub async fn create<C, U>(
    State(contact_usecase): State<Arc<ContactUseCase<C, U>>>,
    _auth: AuthUser,
    Json(model): Json<InsertContactModel>,
) -> impl IntoResponse
where
    C: ContactRepository + Send + Sync + 'static,
    U: UserRecordRepository + Send + Sync + 'static,
{
    match contact_usecase.create_contact(model).await {
        Ok(contact) => (StatusCode::CREATED, Json(contact)).into_response(),
        Err(err) => AppError(err).into_response(),
    }
}

pub async fn list<C, U>(
    State(contact_usecase): State<Arc<ContactUseCase<C, U>>>,
    _auth: AuthUser,
    Query(query): Query<ListContactsQuery>,
) -> impl IntoResponse
where
    C: ContactRepository + Send + Sync + 'static,
    U: UserRecordRepository + Send + Sync + 'static,
{
    let filter = ContactFilter::new(query.contact_type, query.phase, query.limit, query.offset);

    match contact_usecase.list_contacts(filter).await {
        Ok(contacts) => (StatusCode::OK, Json(contacts)).into_response(),
        Err(err) => AppError(err).into_response(),
    }
}

pub async fn transition_phase<C, U>(
    State(contact_usecase): State<Arc<ContactUseCase<C, U>>>,
    _auth: AuthUser,
    Path(contact_id): Path<Uuid>,
    Json(model): Json<UpdatePhaseModel>,
) -> impl IntoResponse
where
    C: ContactRepository + Send + Sync + 'static,
    U: UserRecordRepository + Send + Sync + 'static,
{
    match contact_usecase.transition_phase(contact_id, model.phase).await {
        Ok(contact) => (StatusCode::OK, Json(contact)).into_response(),
        Err(err) => AppError(err).into_response(),
    }
}

pub async fn store_record<C, U>(
    State(contact_usecase): State<Arc<ContactUseCase<C, U>>>,
    auth: AuthUser,
    Json(model): Json<StoreRecordModel>,
) -> impl IntoResponse
where
    C: ContactRepository + Send + Sync + 'static,
    U: UserRecordRepository + Send + Sync + 'static,
{
    match contact_usecase.store_record(auth.user_id, model).await {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(err) => AppError(err).into_response(),
    }
}

pub async fn my_records<C, U>(
    State(contact_usecase): State<Arc<ContactUseCase<C, U>>>,
    auth: AuthUser,
) -> impl IntoResponse
where
    C: ContactRepository + Send + Sync + 'static,
    U: UserRecordRepository + Send + Sync + 'static,
{
    match contact_usecase.list_user_records(auth.user_id).await {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(err) => AppError(err).into_response(),
    }
}

pub async fn my_leads<C, U>(
    State(contact_usecase): State<Arc<ContactUseCase<C, U>>>,
    auth: AuthUser,
) -> impl IntoResponse
where
    C: ContactRepository + Send + Sync + 'static,
    U: UserRecordRepository + Send + Sync + 'static,
{
    match contact_usecase.list_user_leads(auth.user_id).await {
        Ok(leads) => (StatusCode::OK, Json(leads)).into_response(),
        Err(err) => AppError(err).into_response(),
    }
}
