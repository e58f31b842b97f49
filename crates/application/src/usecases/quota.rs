use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use domain::{
    entities::subscriptions::SubscriptionEntity,
    repositories::{
        subscriptions::SubscriptionRepository, validation_histories::ValidationHistoryRepository,
    },
    value_objects::{
        quota::{FREE_TIER_EXCEEDED_MESSAGE, LimitType, QuotaPolicy, UserUsage, ValidationLimit},
        subscriptions::SubscriptionStatusDto,
    },
};

use crate::errors::{UseCaseError, UseCaseResult};
use crate::usecases::usage_ledger::UsageLedger;

/// Decides, per request, whether a user may consume validation capacity.
///
/// The check is a soft limit: two concurrent requests can both pass before either
/// records its history row, overshooting the free tier by at most one batch each.
pub struct QuotaEngine<S, V>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    V: ValidationHistoryRepository + Send + Sync + 'static,
{
    subscription_repo: Arc<S>,
    usage_ledger: Arc<UsageLedger<V>>,
    policy: QuotaPolicy,
}

impl<S, V> QuotaEngine<S, V>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    V: ValidationHistoryRepository + Send + Sync + 'static,
{
    pub fn new(
        subscription_repo: Arc<S>,
        usage_ledger: Arc<UsageLedger<V>>,
        policy: QuotaPolicy,
    ) -> Self {
        Self {
            subscription_repo,
            usage_ledger,
            policy,
        }
    }

    pub fn policy(&self) -> &QuotaPolicy {
        &self.policy
    }

    pub async fn active_subscription(
        &self,
        user_id: Uuid,
    ) -> UseCaseResult<Option<SubscriptionEntity>> {
        let now = Utc::now();
        let subscription = self
            .subscription_repo
            .find_active_by_user(user_id, now)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "quota: failed to load active subscription");
                UseCaseError::Internal(err)
            })?;

        // The expiry sweep may not have run yet.
        Ok(subscription.filter(|subscription| subscription.is_active_at(now)))
    }

    pub async fn get_validation_limit(&self, user_id: Uuid) -> UseCaseResult<ValidationLimit> {
        if let Some(subscription) = self.active_subscription(user_id).await? {
            return Ok(ValidationLimit::premium(subscription.end_date));
        }

        let used = self.usage_ledger.used_validations(user_id).await?;
        let limit = ValidationLimit::from_usage(used, self.policy.free_limit);

        info!(
            %user_id,
            used,
            remaining_free = limit.remaining_free,
            limit_type = ?limit.limit_type,
            "quota: validation limit computed"
        );
        Ok(limit)
    }

    /// Limit as seen by a caller about to submit `requested` numbers.
    pub async fn limit_for(&self, user_id: Uuid, requested: i64) -> UseCaseResult<ValidationLimit> {
        let mut limit = self.get_validation_limit(user_id).await?;

        if limit.can_validate && !limit.allows_batch(requested) {
            limit.can_validate = false;
            limit.message = Some(Self::batch_too_large_message(requested, limit.remaining_free));
        }

        Ok(limit)
    }

    /// Rejects the whole batch when it does not fit; a batch is never partially admitted.
    pub async fn check_batch(&self, user_id: Uuid, requested: i64) -> UseCaseResult<ValidationLimit> {
        let limit = self.get_validation_limit(user_id).await?;

        if limit.allows_batch(requested) {
            return Ok(limit);
        }

        let message = match limit.limit_type {
            LimitType::Exceeded => FREE_TIER_EXCEEDED_MESSAGE.to_string(),
            _ => Self::batch_too_large_message(requested, limit.remaining_free),
        };

        warn!(
            %user_id,
            requested,
            remaining_free = limit.remaining_free,
            "quota: validation batch rejected"
        );
        Err(UseCaseError::QuotaExceeded(message))
    }

    pub async fn get_user_usage(&self, user_id: Uuid) -> UseCaseResult<UserUsage> {
        let active = self.active_subscription(user_id).await?;
        let used = match active {
            Some(_) => 0,
            None => self.usage_ledger.used_validations(user_id).await?,
        };

        Ok(UserUsage::new(active.as_ref(), used, self.policy.free_limit))
    }

    pub async fn get_status(&self, user_id: Uuid) -> UseCaseResult<SubscriptionStatusDto> {
        let usage = self.get_user_usage(user_id).await?;
        let limit = self.get_validation_limit(user_id).await?;

        Ok(SubscriptionStatusDto {
            usage,
            limit,
            premium_price_minor: self.policy.premium_price_minor,
            currency: self.policy.currency.clone(),
        })
    }

    fn batch_too_large_message(requested: i64, remaining: i64) -> String {
        format!(
            "Requested {requested} validations but only {remaining} free validations remain. Please upgrade to continue."
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration};
    use domain::repositories::{
        subscriptions::MockSubscriptionRepository,
        validation_histories::MockValidationHistoryRepository,
    };

    fn subscription(user_id: Uuid, status: &str, end_date: DateTime<Utc>) -> SubscriptionEntity {
        let now = Utc::now();
        SubscriptionEntity {
            id: Uuid::new_v4(),
            user_id,
            plan: "PREMIUM".to_string(),
            status: status.to_string(),
            start_date: now - Duration::days(30),
            end_date,
            created_at: now,
            updated_at: now,
        }
    }

    fn engine(
        active: Option<SubscriptionEntity>,
        used: i64,
    ) -> QuotaEngine<MockSubscriptionRepository, MockValidationHistoryRepository> {
        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_find_active_by_user()
            .returning(move |_, _| {
                let active = active.clone();
                Box::pin(async move { Ok(active) })
            });

        let mut history_repo = MockValidationHistoryRepository::new();
        history_repo
            .expect_sum_total_by_user()
            .returning(move |_| Box::pin(async move { Ok(used) }));

        QuotaEngine::new(
            Arc::new(subscription_repo),
            Arc::new(UsageLedger::new(Arc::new(history_repo))),
            QuotaPolicy::default(),
        )
    }

    #[tokio::test]
    async fn new_user_gets_the_full_free_tier() {
        let limit = engine(None, 0)
            .get_validation_limit(Uuid::new_v4())
            .await
            .unwrap();

        assert_eq!(limit.limit_type, LimitType::Free);
        assert_eq!(limit.remaining_free, 5);
        assert!(limit.can_validate);
    }

    #[tokio::test]
    async fn exhausted_free_tier_is_exceeded() {
        let limit = engine(None, 5)
            .get_validation_limit(Uuid::new_v4())
            .await
            .unwrap();

        assert_eq!(limit.limit_type, LimitType::Exceeded);
        assert!(!limit.can_validate);

        let limit = engine(None, 4)
            .get_validation_limit(Uuid::new_v4())
            .await
            .unwrap();
        assert!(limit.can_validate);
    }

    #[tokio::test]
    async fn active_subscription_is_premium_regardless_of_usage() {
        let user_id = Uuid::new_v4();
        let end = Utc::now() + Duration::days(10);
        let limit = engine(Some(subscription(user_id, "ACTIVE", end)), 500)
            .get_validation_limit(user_id)
            .await
            .unwrap();

        assert_eq!(limit.limit_type, LimitType::Premium);
        assert_eq!(limit.subscription_end_date, Some(end));
    }

    #[tokio::test]
    async fn ended_but_unswept_subscription_is_not_active() {
        let user_id = Uuid::new_v4();
        let ended = subscription(user_id, "ACTIVE", Utc::now() - Duration::hours(1));
        let quota = engine(Some(ended), 5);

        let limit = quota.get_validation_limit(user_id).await.unwrap();
        assert_eq!(limit.limit_type, LimitType::Exceeded);

        let usage = quota.get_user_usage(user_id).await.unwrap();
        assert!(!usage.has_active_subscription);
        assert_eq!(usage.free_validations_used, 5);
    }

    #[tokio::test]
    async fn batch_larger_than_remaining_is_rejected_whole() {
        let result = engine(None, 2).check_batch(Uuid::new_v4(), 4).await;
        assert!(matches!(result, Err(UseCaseError::QuotaExceeded(_))));

        let limit = engine(None, 2).check_batch(Uuid::new_v4(), 3).await.unwrap();
        assert_eq!(limit.remaining_free, 3);
    }

    #[tokio::test]
    async fn limit_for_a_count_reports_refusal_without_failing() {
        let limit = engine(None, 3).limit_for(Uuid::new_v4(), 10).await.unwrap();
        assert!(!limit.can_validate);
        assert_eq!(limit.limit_type, LimitType::Free);
        assert!(limit.message.is_some());
    }

    #[tokio::test]
    async fn status_reports_price_and_zero_usage_for_premium() {
        let user_id = Uuid::new_v4();
        let end = Utc::now() + Duration::days(3);
        let status = engine(Some(subscription(user_id, "ACTIVE", end)), 40)
            .get_status(user_id)
            .await
            .unwrap();

        assert_eq!(status.premium_price_minor, 1999);
        assert_eq!(status.currency, "USD");
        assert_eq!(status.usage.free_validations_used, 0);
        assert!(status.usage.has_active_subscription);
    }
}
