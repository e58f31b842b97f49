use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use futures_util::{StreamExt, stream};
use tracing::{error, info};

use domain::{
    repositories::contacts::ContactRepository,
    value_objects::{
        sweeps::{ContactSweepReport, RetentionPolicy, SweepItemOutcome},
    },
};

/// Recycles DELIVERED contacts whose delivery is older than the retention window back
/// into CLEANED. One failing contact never stops the sweep.
pub struct ContactRetentionUseCase {
    repository: Arc<dyn ContactRepository + Send + Sync>,
    policy: RetentionPolicy,
}

impl ContactRetentionUseCase {
    pub fn new(repository: Arc<dyn ContactRepository + Send + Sync>, policy: RetentionPolicy) -> Self {
        Self { repository, policy }
    }

    pub async fn run(&self, now: DateTime<Utc>) -> Result<ContactSweepReport> {
        let cutoff = self.policy.cutoff(now);
        let stale = self.repository.list_delivered_before(cutoff).await?;

        let initial = ContactSweepReport {
            scanned: stale.len(),
            ..Default::default()
        };

        let report = stream::iter(stale)
            .then(|contact| {
                let repository = Arc::clone(&self.repository);
                async move {
                    match repository
                        .reset_stale_delivery(contact.id, cutoff, now)
                        .await
                    {
                        Ok(Some(_)) => SweepItemOutcome::Reset(contact.id),
                        Ok(None) => {
                            info!(contact_id = %contact.id, "contact_retention: contact moved or removed since listing, skipped");
                            SweepItemOutcome::Skipped(contact.id)
                        }
                        Err(err) => {
                            error!(
                                contact_id = %contact.id,
                                db_error = ?err,
                                "contact_retention: failed to reset contact; continuing"
                            );
                            SweepItemOutcome::Failed {
                                id: contact.id,
                                error: err.to_string(),
                            }
                        }
                    }
                }
            })
            .fold(initial, |report, outcome| async move { report.record(outcome) })
            .await;

        info!(
            %cutoff,
            scanned = report.scanned,
            reset = report.reset,
            skipped = report.skipped,
            failed = report.failed,
            "contact_retention: completed"
        );

        Ok(report)
    }
}
