use anyhow::Result;
use domain::repositories::{
    contacts::ContactRepository, subscriptions::SubscriptionRepository,
};
use infra::postgres::{
    postgres_connection,
    repositories::{contacts::ContactPostgres, subscriptions::SubscriptionPostgres},
};
use std::sync::Arc;
use tracing::{error, info};
use worker::{
    axum_http, config,
    services::sweep_scheduler,
    usecases::{
        contact_retention::ContactRetentionUseCase, subscription_expiry::SubscriptionExpiryUseCase,
    },
};

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(error) = run().await {
        error!("Worker exited with error: {:#}", error);
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    infra::observability::init_observability("worker")?;

    let dotenvy_env = Arc::new(config::config_loader::load()?);
    info!("ENV has been loaded");

    let postgres_pool = postgres_connection::establish_connection(
        &dotenvy_env.database.url,
        dotenvy_env.database.max_connections,
    )?;
    info!("Postgres connection has been established");

    let db_pool_arc = Arc::new(postgres_pool);

    let contact_repository: Arc<dyn ContactRepository + Send + Sync> =
        Arc::new(ContactPostgres::new(Arc::clone(&db_pool_arc)));
    let subscription_repository: Arc<dyn SubscriptionRepository + Send + Sync> =
        Arc::new(SubscriptionPostgres::new(Arc::clone(&db_pool_arc)));

    let contact_retention = Arc::new(ContactRetentionUseCase::new(
        contact_repository,
        dotenvy_env.sweeps.retention,
    ));
    let subscription_expiry = Arc::new(SubscriptionExpiryUseCase::new(subscription_repository));

    let contact_loop = tokio::spawn(sweep_scheduler::run_contact_retention_loop(
        Arc::clone(&contact_retention),
        dotenvy_env.sweeps.contact_interval,
    ));
    let subscription_loop = tokio::spawn(sweep_scheduler::run_subscription_expiry_loop(
        Arc::clone(&subscription_expiry),
        dotenvy_env.sweeps.subscription_interval,
    ));

    let server_config = Arc::clone(&dotenvy_env);
    let internal_server = tokio::spawn(async move {
        axum_http::http_serve::start(server_config, contact_retention, subscription_expiry).await
    });

    info!("Worker started");

    tokio::select! {
        result = contact_loop => result??,
        result = subscription_loop => result??,
        result = internal_server => result??,
    };
    Ok(())
}
