use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::info;

use domain::{
    repositories::subscriptions::SubscriptionRepository,
    value_objects::sweeps::SubscriptionSweepReport,
};

pub struct SubscriptionExpiryUseCase {
    repository: Arc<dyn SubscriptionRepository + Send + Sync>,
}

impl SubscriptionExpiryUseCase {
    pub fn new(repository: Arc<dyn SubscriptionRepository + Send + Sync>) -> Self {
        Self { repository }
    }

    /// Flips ACTIVE subscriptions past their end date to EXPIRED. Idempotent.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<SubscriptionSweepReport> {
        let expired = self.repository.expire_ended(now).await?;

        info!(expired, %now, "subscription_expiry: completed");
        Ok(SubscriptionSweepReport { expired })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use domain::repositories::subscriptions::MockSubscriptionRepository;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        status: &'static str,
        end_date: DateTime<Utc>,
    }

    fn repository_over(rows: Arc<Mutex<Vec<Row>>>) -> MockSubscriptionRepository {
        let mut repository = MockSubscriptionRepository::new();
        repository.expect_expire_ended().returning(move |now| {
            let mut rows = rows.lock().unwrap();
            let mut changed = 0;
            for row in rows.iter_mut() {
                if row.status == "ACTIVE" && row.end_date <= now {
                    row.status = "EXPIRED";
                    changed += 1;
                }
            }
            Box::pin(async move { Ok(changed) })
        });
        repository
    }

    #[tokio::test]
    async fn running_twice_equals_running_once() {
        let now = Utc::now();
        let rows = Arc::new(Mutex::new(vec![
            Row { status: "ACTIVE", end_date: now - Duration::days(1) },
            Row { status: "ACTIVE", end_date: now - Duration::days(40) },
            Row { status: "ACTIVE", end_date: now + Duration::days(10) },
            Row { status: "CANCELLED", end_date: now - Duration::days(3) },
        ]));
        let usecase = SubscriptionExpiryUseCase::new(Arc::new(repository_over(Arc::clone(&rows))));

        let first = usecase.run(now).await.unwrap();
        let after_first = rows.lock().unwrap().clone();
        let second = usecase.run(now).await.unwrap();
        let after_second = rows.lock().unwrap().clone();

        assert_eq!(first, SubscriptionSweepReport { expired: 2 });
        assert_eq!(second, SubscriptionSweepReport { expired: 0 });
        assert_eq!(after_first, after_second);
        assert_eq!(after_second[2].status, "ACTIVE");
        assert_eq!(after_second[3].status, "CANCELLED");
    }

    #[tokio::test]
    async fn repository_error_is_propagated() {
        let mut repository = MockSubscriptionRepository::new();
        repository
            .expect_expire_ended()
            .returning(|_| Box::pin(async { Err(anyhow::anyhow!("db down")) }));

        let result = SubscriptionExpiryUseCase::new(Arc::new(repository))
            .run(Utc::now())
            .await;

        assert!(result.is_err());
    }
}
