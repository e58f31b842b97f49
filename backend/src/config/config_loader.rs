use std::{str::FromStr, time::Duration};

use anyhow::{Context, Result};
use domain::value_objects::{
    phone_validation::{BulkValidationPolicy, DEFAULT_BULK_CHUNK_DELAY_MS, DEFAULT_BULK_CHUNK_SIZE},
    quota::{DEFAULT_FREE_TIER_LIMIT, DEFAULT_PREMIUM_PRICE_MINOR, DEFAULT_SUBSCRIPTION_DURATION_DAYS, QuotaPolicy},
};
use infra::providers::{
    square_gateway::{SquareEnvironment, SquareSettings},
    stripe_gateway::{DEFAULT_STRIPE_WEBHOOK_TOLERANCE, StripeSettings},
    twilio_lookup::TwilioCredentials,
};

use super::config_model::{
    Auth, BackendServer, Database, DotEnvyConfig, ValidationArchiveConfig,
};

const DEFAULT_PRODUCT_NAME: &str = "Premium Subscription";

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let backend_server = BackendServer {
        port: required("SERVER_PORT_BACKEND")?
            .parse()
            .context("SERVER_PORT_BACKEND is invalid")?,
        body_limit: required("SERVER_BODY_LIMIT")?
            .parse()
            .context("SERVER_BODY_LIMIT is invalid")?,
        timeout: required("SERVER_TIMEOUT")?
            .parse()
            .context("SERVER_TIMEOUT is invalid")?,
    };

    let database = Database {
        url: required("DATABASE_URL")?,
        max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 10)?,
    };

    let auth = Auth {
        jwt_secret: required("AUTH_JWT_SECRET")?,
    };

    let quota = QuotaPolicy {
        free_limit: parse_or("FREE_TIER_LIMIT", DEFAULT_FREE_TIER_LIMIT)?,
        premium_price_minor: parse_or("PREMIUM_PRICE_MINOR", DEFAULT_PREMIUM_PRICE_MINOR)?,
        currency: optional("PREMIUM_CURRENCY").unwrap_or_else(|| "USD".to_string()),
        subscription_duration_days: parse_or(
            "SUBSCRIPTION_DURATION_DAYS",
            DEFAULT_SUBSCRIPTION_DURATION_DAYS,
        )?,
    };

    let chunk_size: usize = parse_or("BULK_CHUNK_SIZE", DEFAULT_BULK_CHUNK_SIZE)?;
    let bulk_validation = BulkValidationPolicy {
        chunk_size: chunk_size.max(1),
        chunk_delay: Duration::from_millis(parse_or(
            "BULK_CHUNK_DELAY_MS",
            DEFAULT_BULK_CHUNK_DELAY_MS,
        )?),
    };

    let validation_archive = ValidationArchiveConfig {
        dir: optional("VALIDATION_ARCHIVE_DIR")
            .unwrap_or_else(|| "public/uploads/validations".to_string()),
        prefix: optional("VALIDATION_ARCHIVE_PREFIX").unwrap_or_else(|| "VNC".to_string()),
    };

    let twilio = match (optional("TWILIO_ACCOUNT_SID"), optional("TWILIO_AUTH_TOKEN")) {
        (Some(account_sid), Some(auth_token)) => Some(TwilioCredentials {
            account_sid,
            auth_token,
        }),
        _ => None,
    };

    let stripe = match (optional("STRIPE_SECRET_KEY"), optional("STRIPE_WEBHOOK_SECRET")) {
        (Some(secret_key), Some(webhook_secret)) => Some(StripeSettings {
            secret_key,
            webhook_secret,
            product_name: optional("STRIPE_PRODUCT_NAME")
                .unwrap_or_else(|| DEFAULT_PRODUCT_NAME.to_string()),
            webhook_tolerance: Duration::from_secs(parse_or(
                "STRIPE_WEBHOOK_TOLERANCE_SECS",
                DEFAULT_STRIPE_WEBHOOK_TOLERANCE.as_secs(),
            )?),
        }),
        _ => None,
    };

    let square = match (
        optional("SQUARE_ACCESS_TOKEN"),
        optional("SQUARE_LOCATION_ID"),
        optional("SQUARE_WEBHOOK_SIGNATURE_KEY"),
        optional("SQUARE_WEBHOOK_URL"),
    ) {
        (Some(access_token), Some(location_id), Some(webhook_signature_key), Some(webhook_url)) => {
            Some(SquareSettings {
                access_token,
                location_id,
                webhook_signature_key,
                webhook_url,
                product_name: optional("SQUARE_PRODUCT_NAME")
                    .unwrap_or_else(|| DEFAULT_PRODUCT_NAME.to_string()),
                environment: SquareEnvironment::from_str(
                    &optional("SQUARE_ENVIRONMENT").unwrap_or_default(),
                ),
            })
        }
        _ => None,
    };

    Ok(DotEnvyConfig {
        backend_server,
        database,
        auth,
        quota,
        bulk_validation,
        validation_archive,
        twilio,
        stripe,
        square,
    })
}

fn required(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("{key} is not set"))
}

fn optional(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|v| {
        let trimmed = v.trim().to_string();
        (!trimmed.is_empty()).then_some(trimmed)
    })
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional(key) {
        Some(raw) => raw.parse().with_context(|| format!("{key} is invalid")),
        None => Ok(default),
    }
}
