use std::{fmt::Debug, future::Future, sync::Arc, time::Duration};

use anyhow::Result;
use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::usecases::{
    contact_retention::ContactRetentionUseCase, subscription_expiry::SubscriptionExpiryUseCase,
};

pub async fn run_contact_retention_loop(
    usecase: Arc<ContactRetentionUseCase>,
    period: Duration,
) -> Result<()> {
    run_every("contact_retention", period, move || {
        let usecase = Arc::clone(&usecase);
        async move { usecase.run(Utc::now()).await }
    })
    .await
}

pub async fn run_subscription_expiry_loop(
    usecase: Arc<SubscriptionExpiryUseCase>,
    period: Duration,
) -> Result<()> {
    run_every("subscription_expiry", period, move || {
        let usecase = Arc::clone(&usecase);
        async move { usecase.run(Utc::now()).await }
    })
    .await
}

/// First run fires immediately. A failed run is logged and the loop waits for the next tick.
async fn run_every<F, Fut, T>(name: &'static str, period: Duration, mut job: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    T: Debug,
{
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(sweep = name, period_secs = period.as_secs(), "sweep scheduler started");

    loop {
        ticker.tick().await;
        match job().await {
            Ok(report) => info!(sweep = name, ?report, "sweep run finished"),
            Err(err) => error!(sweep = name, error = ?err, "sweep run failed; waiting for next tick"),
        }
    }
}
