use std::{collections::HashMap, net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Result;
use axum::{
    Extension, Router,
    http::{
        Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::get,
};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;

use crate::{
    auth::AuthSettings,
    axum_http::{default_routers, routers},
    config::config_model::DotEnvyConfig,
};
use application::{
    interfaces::payment_gateway::PaymentGateway,
    usecases::{
        phone_validation::PhoneValidationUseCase,
        quota::QuotaEngine,
        subscriptions::{PaymentGateways, SubscriptionUseCase},
        usage_ledger::UsageLedger,
    },
};
use domain::value_objects::enums::payment_methods::PaymentMethod;
use infra::{
    postgres::{
        postgres_connection::PgPoolSquad,
        repositories::{
            payments::PaymentPostgres, subscriptions::SubscriptionPostgres,
            validation_histories::ValidationHistoryPostgres,
        },
    },
    providers::{
        square_gateway::SquareGateway, stripe_gateway::StripeGateway,
        twilio_lookup::TwilioLookupClient,
    },
    storage::local_validation_archive::LocalValidationArchive,
};

pub async fn start(config: Arc<DotEnvyConfig>, db_pool: Arc<PgPoolSquad>) -> Result<()> {
    let subscription_repository = Arc::new(SubscriptionPostgres::new(Arc::clone(&db_pool)));
    let validation_history_repository =
        Arc::new(ValidationHistoryPostgres::new(Arc::clone(&db_pool)));
    let payment_repository = Arc::new(PaymentPostgres::new(Arc::clone(&db_pool)));

    let usage_ledger = Arc::new(UsageLedger::new(validation_history_repository));
    let quota_engine = Arc::new(QuotaEngine::new(
        Arc::clone(&subscription_repository),
        Arc::clone(&usage_ledger),
        config.quota.clone(),
    ));

    let phone_validation_usecase = Arc::new(PhoneValidationUseCase::new(
        Arc::new(TwilioLookupClient::new(config.twilio.clone())),
        Arc::new(LocalValidationArchive::new(
            &config.validation_archive.dir,
            config.validation_archive.prefix.clone(),
        )),
        Arc::clone(&quota_engine),
        Arc::clone(&usage_ledger),
        config.bulk_validation,
    ));

    let subscription_usecase = Arc::new(SubscriptionUseCase::new(
        payment_repository,
        subscription_repository,
        payment_gateways(&config),
        config.quota.clone(),
    ));

    let request_timeout = Duration::from_secs(config.backend_server.timeout);

    let app = Router::new()
        .nest("/api/v1/contacts", routers::contacts::routes(Arc::clone(&db_pool)))
        .nest(
            "/api/v1/subscriptions",
            routers::subscriptions::routes(Arc::clone(&subscription_usecase), Arc::clone(&quota_engine)),
        )
        .nest("/api/v1/webhooks", routers::webhooks::routes(subscription_usecase))
        .route("/api/v1/health-check", get(default_routers::health_check))
        .route_layer(TimeoutLayer::new(request_timeout))
        .nest(
            "/api/v1/phone-validation",
            routers::phone_validation::routes(phone_validation_usecase, quota_engine, request_timeout),
        )
        .fallback(default_routers::not_found)
        .layer(Extension(Arc::new(AuthSettings {
            jwt_secret: config.auth.jwt_secret.clone(),
        })))
        .layer(RequestBodyLimitLayer::new(
            (config.backend_server.body_limit * 1024 * 1024).try_into()?,
        ))
        .layer(
            CorsLayer::new()
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PATCH,
                    Method::PUT,
                    Method::DELETE,
                ])
                .allow_headers([AUTHORIZATION, CONTENT_TYPE])
                .allow_origin(Any),
        )
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.backend_server.port));
    let listener = TcpListener::bind(addr).await?;

    info!("Server is running on port {}", config.backend_server.port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Providers without credentials are left out; checkout against them answers 502.
fn payment_gateways(config: &DotEnvyConfig) -> PaymentGateways {
    let mut gateways: PaymentGateways = HashMap::new();

    if let Some(stripe) = config.stripe.clone() {
        let gateway: Arc<dyn PaymentGateway> = Arc::new(StripeGateway::new(stripe));
        gateways.insert(PaymentMethod::Stripe, gateway);
    }
    if let Some(square) = config.square.clone() {
        let gateway: Arc<dyn PaymentGateway> = Arc::new(SquareGateway::new(square));
        gateways.insert(PaymentMethod::Square, gateway);
    }

    info!(
        stripe = gateways.contains_key(&PaymentMethod::Stripe),
        square = gateways.contains_key(&PaymentMethod::Square),
        "payment gateways registered"
    );
    gateways
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = ?err, "Failed to install CTRL+C signal handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = ?err, "Failed to install SIGTERM signal handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }
}
