use std::{str::FromStr, time::Duration};

use anyhow::{Context, Result};
use domain::value_objects::sweeps::{DEFAULT_RETENTION_MONTHS, RetentionPolicy};

use super::config_model::{Database, DotEnvyConfig, Sweeps, WorkerServer};

const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 86_400;

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let worker_server = WorkerServer {
        port: required("SERVER_PORT_WORKER")?
            .parse()
            .context("SERVER_PORT_WORKER is invalid")?,
        body_limit: required("SERVER_BODY_LIMIT")?
            .parse()
            .context("SERVER_BODY_LIMIT is invalid")?,
        timeout: required("SERVER_TIMEOUT")?
            .parse()
            .context("SERVER_TIMEOUT is invalid")?,
    };

    let database = Database {
        url: required("DATABASE_URL")?,
        max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 5)?,
    };

    let sweeps = Sweeps {
        internal_token: optional("INTERNAL_SWEEP_TOKEN"),
        retention: RetentionPolicy {
            months: parse_or("CONTACT_RETENTION_MONTHS", DEFAULT_RETENTION_MONTHS)?,
        },
        contact_interval: interval("CONTACT_SWEEP_INTERVAL_SECS")?,
        subscription_interval: interval("SUBSCRIPTION_SWEEP_INTERVAL_SECS")?,
    };

    Ok(DotEnvyConfig {
        worker_server,
        database,
        sweeps,
    })
}

fn interval(key: &str) -> Result<Duration> {
    let secs: u64 = parse_or(key, DEFAULT_SWEEP_INTERVAL_SECS)?;
    anyhow::ensure!(secs > 0, "{key} must be greater than zero");
    Ok(Duration::from_secs(secs))
}

fn required(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("{key} is invalid"))
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
