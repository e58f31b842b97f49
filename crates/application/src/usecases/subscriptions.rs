use std::{collections::HashMap, sync::Arc};

use chrono::{Duration, Utc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use domain::{
    entities::{
        payments::{NewPaymentEntity, PaymentEntity},
        subscriptions::{InsertSubscriptionEntity, SubscriptionEntity},
    },
    repositories::{payments::PaymentRepository, subscriptions::SubscriptionRepository},
    value_objects::{
        enums::{
            payment_methods::PaymentMethod, payment_statuses::PaymentStatus,
            subscription_plans::SubscriptionPlan, subscription_statuses::SubscriptionStatus,
        },
        payments::{CheckoutRequest, CheckoutSessionDto, ProviderEvent, WebhookDelivery},
        quota::QuotaPolicy,
        subscriptions::{PaymentModel, PremiumGrantDto, SubscriptionHistoryDto, SubscriptionModel},
    },
};

use crate::errors::{UseCaseError, UseCaseResult};
use crate::interfaces::payment_gateway::{PaymentGateway, WebhookError};

pub type PaymentGateways = HashMap<PaymentMethod, Arc<dyn PaymentGateway>>;

const ALREADY_SUBSCRIBED_MESSAGE: &str = "User already has an active subscription";

pub struct SubscriptionUseCase<P, S>
where
    P: PaymentRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
{
    payment_repo: Arc<P>,
    subscription_repo: Arc<S>,
    gateways: PaymentGateways,
    policy: QuotaPolicy,
}

impl<P, S> SubscriptionUseCase<P, S>
where
    P: PaymentRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
{
    pub fn new(
        payment_repo: Arc<P>,
        subscription_repo: Arc<S>,
        gateways: PaymentGateways,
        policy: QuotaPolicy,
    ) -> Self {
        Self {
            payment_repo,
            subscription_repo,
            gateways,
            policy,
        }
    }

    pub async fn create_checkout(
        &self,
        user_id: Uuid,
        method: PaymentMethod,
        success_url: String,
        cancel_url: Option<String>,
    ) -> UseCaseResult<CheckoutSessionDto> {
        info!(%user_id, %method, "subscriptions: checkout requested");

        let gateway = self.gateway(method)?;
        self.ensure_not_subscribed(user_id).await?;

        let now = Utc::now();
        let payment = self
            .payment_repo
            .create(NewPaymentEntity {
                user_id,
                subscription_id: None,
                amount_minor: self.policy.premium_price_minor,
                currency: self.policy.currency.clone(),
                status: PaymentStatus::Pending.to_string(),
                method: method.to_string(),
                transaction_id: None,
                provider_reference: None,
                created_at: now,
                updated_at: now,
            })
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "subscriptions: failed to create pending payment");
                UseCaseError::Internal(err)
            })?;

        let session = gateway
            .create_checkout(CheckoutRequest {
                payment_id: payment.id,
                user_id,
                amount_minor: payment.amount_minor,
                currency: payment.currency.clone(),
                success_url,
                cancel_url,
            })
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    payment_id = %payment.id,
                    %method,
                    error = ?err,
                    "subscriptions: provider refused checkout, payment left pending"
                );
                UseCaseError::ProviderUnavailable(format!("{method} checkout could not be created"))
            })?;

        self.payment_repo
            .set_provider_reference(payment.id, session.provider_reference.clone())
            .await
            .map_err(|err| {
                error!(
                    payment_id = %payment.id,
                    db_error = ?err,
                    "subscriptions: failed to store provider reference"
                );
                UseCaseError::Internal(err)
            })?;

        info!(%user_id, payment_id = %payment.id, %method, "subscriptions: checkout created");
        Ok(CheckoutSessionDto {
            url: session.redirect_url,
            payment_id: payment.id,
            provider_reference: session.provider_reference,
        })
    }

    /// Entry point for provider webhooks. Nothing is read or written before the
    /// gateway has accepted the signature.
    pub async fn handle_webhook(
        &self,
        method: PaymentMethod,
        delivery: WebhookDelivery,
    ) -> UseCaseResult<()> {
        let gateway = self.gateway(method)?;

        let event = gateway
            .parse_webhook(delivery)
            .await
            .map_err(|err| match err {
                WebhookError::InvalidSignature(reason) => {
                    warn!(%method, %reason, "subscriptions: webhook signature rejected");
                    UseCaseError::InvalidSignature(reason)
                }
                WebhookError::Malformed(reason) => {
                    warn!(%method, %reason, "subscriptions: malformed webhook payload");
                    UseCaseError::BadRequest(reason)
                }
                WebhookError::Provider(err) => {
                    error!(%method, error = ?err, "subscriptions: provider lookup during webhook failed");
                    UseCaseError::ProviderUnavailable(format!("{method} did not answer"))
                }
            })?;

        match event {
            ProviderEvent::PaymentCompleted {
                payment_id,
                transaction_id,
            } => self.complete_payment(payment_id, transaction_id).await,
            ProviderEvent::PaymentFailed { payment_id } => self.fail_payment(payment_id).await,
            ProviderEvent::Ignored { event_type } => {
                debug!(%method, %event_type, "subscriptions: unhandled webhook event type");
                Ok(())
            }
        }
    }

    /// Marks the payment completed and grants premium exactly once per payment.
    ///
    /// The subscription insert and the payment link commit together under a row lock,
    /// so a failed grant leaves the payment unlinked for the provider's redelivery.
    pub async fn complete_payment(
        &self,
        payment_id: Uuid,
        transaction_id: Option<String>,
    ) -> UseCaseResult<()> {
        let Some(payment) = self.find_payment(payment_id).await? else {
            warn!(%payment_id, "subscriptions: completion for unknown payment dropped");
            return Ok(());
        };

        let payment = self
            .payment_repo
            .mark_completed(payment_id, transaction_id)
            .await
            .map_err(|err| {
                error!(%payment_id, db_error = ?err, "subscriptions: failed to mark payment completed");
                UseCaseError::Internal(err)
            })?
            .unwrap_or(payment);

        if let Some(subscription_id) = payment.subscription_id {
            info!(%payment_id, %subscription_id, "subscriptions: duplicate completion ignored");
            return Ok(());
        }

        let now = Utc::now();
        let insert_subscription_entity =
            self.premium_subscription(Uuid::new_v4(), payment.user_id, now);

        let granted = self
            .payment_repo
            .grant_subscription_if_unlinked(payment_id, insert_subscription_entity)
            .await
            .map_err(|err| {
                error!(%payment_id, db_error = ?err, "subscriptions: failed to grant subscription");
                UseCaseError::Internal(err)
            })?;

        match granted {
            Some(subscription) => info!(
                %payment_id,
                subscription_id = %subscription.id,
                user_id = %subscription.user_id,
                end_date = %subscription.end_date,
                "subscriptions: premium granted from payment"
            ),
            None => info!(%payment_id, "subscriptions: another delivery already linked this payment"),
        }

        Ok(())
    }

    pub async fn fail_payment(&self, payment_id: Uuid) -> UseCaseResult<()> {
        let failed = self
            .payment_repo
            .mark_failed(payment_id)
            .await
            .map_err(|err| {
                error!(%payment_id, db_error = ?err, "subscriptions: failed to mark payment failed");
                UseCaseError::Internal(err)
            })?;

        match failed {
            Some(_) => info!(%payment_id, "subscriptions: payment marked failed"),
            None => info!(%payment_id, "subscriptions: failure event for missing or settled payment ignored"),
        }

        Ok(())
    }

    pub async fn grant_manual_premium(&self, user_id: Uuid) -> UseCaseResult<PremiumGrantDto> {
        self.ensure_not_subscribed(user_id).await?;

        let now = Utc::now();
        let subscription = self
            .subscription_repo
            .create(self.premium_subscription(Uuid::new_v4(), user_id, now))
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "subscriptions: failed to create manual subscription");
                UseCaseError::Internal(err)
            })?;

        let payment = self
            .payment_repo
            .create(NewPaymentEntity {
                user_id,
                subscription_id: Some(subscription.id),
                amount_minor: self.policy.premium_price_minor,
                currency: self.policy.currency.clone(),
                status: PaymentStatus::Completed.to_string(),
                method: PaymentMethod::Manual.to_string(),
                transaction_id: None,
                provider_reference: None,
                created_at: now,
                updated_at: now,
            })
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "subscriptions: failed to record manual payment");
                UseCaseError::Internal(err)
            })?;

        info!(%user_id, subscription_id = %subscription.id, "subscriptions: manual premium granted");
        Ok(PremiumGrantDto {
            subscription: SubscriptionModel::from(subscription),
            payment: PaymentModel::from(payment),
        })
    }

    pub async fn subscription_history(&self, user_id: Uuid) -> UseCaseResult<SubscriptionHistoryDto> {
        let subscriptions = self
            .subscription_repo
            .list_by_user(user_id)
            .await
            .map_err(UseCaseError::Internal)?;
        let payments = self
            .payment_repo
            .list_by_user(user_id)
            .await
            .map_err(UseCaseError::Internal)?;

        Ok(SubscriptionHistoryDto {
            subscriptions: subscriptions.into_iter().map(SubscriptionModel::from).collect(),
            payments: payments.into_iter().map(PaymentModel::from).collect(),
        })
    }

    fn gateway(&self, method: PaymentMethod) -> UseCaseResult<&Arc<dyn PaymentGateway>> {
        if method == PaymentMethod::Manual {
            return Err(UseCaseError::BadRequest(
                "Manual payments are not processed through a provider".to_string(),
            ));
        }

        self.gateways.get(&method).ok_or_else(|| {
            warn!(%method, "subscriptions: payment provider not configured");
            UseCaseError::ProviderUnavailable(format!("{method} payments are not configured"))
        })
    }

    async fn ensure_not_subscribed(&self, user_id: Uuid) -> UseCaseResult<()> {
        let now = Utc::now();
        let active: Option<SubscriptionEntity> = self
            .subscription_repo
            .find_active_by_user(user_id, now)
            .await
            .map_err(UseCaseError::Internal)?;

        if active.is_some_and(|subscription| subscription.is_active_at(now)) {
            warn!(%user_id, "subscriptions: user already subscribed");
            return Err(UseCaseError::Conflict(ALREADY_SUBSCRIBED_MESSAGE.to_string()));
        }

        Ok(())
    }

    async fn find_payment(&self, payment_id: Uuid) -> UseCaseResult<Option<PaymentEntity>> {
        self.payment_repo
            .find_by_id(payment_id)
            .await
            .map_err(|err| {
                error!(%payment_id, db_error = ?err, "subscriptions: failed to load payment");
                UseCaseError::Internal(err)
            })
    }

    fn premium_subscription(
        &self,
        id: Uuid,
        user_id: Uuid,
        now: chrono::DateTime<Utc>,
    ) -> InsertSubscriptionEntity {
        InsertSubscriptionEntity {
            id,
            user_id,
            plan: SubscriptionPlan::Premium.to_string(),
            status: SubscriptionStatus::Active.to_string(),
            start_date: now,
            end_date: now + Duration::days(self.policy.subscription_duration_days),
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use anyhow::anyhow;
    use domain::{
        repositories::{payments::MockPaymentRepository, subscriptions::MockSubscriptionRepository},
        value_objects::payments::CheckoutSession,
    };
    use mockall::predicate::eq;

    use crate::interfaces::payment_gateway::MockPaymentGateway;

    fn payment(id: Uuid, user_id: Uuid, subscription_id: Option<Uuid>) -> PaymentEntity {
        let now = Utc::now();
        PaymentEntity {
            id,
            user_id,
            subscription_id,
            amount_minor: 1999,
            currency: "USD".to_string(),
            status: "PENDING".to_string(),
            method: "STRIPE".to_string(),
            transaction_id: None,
            provider_reference: Some("cs_test_123".to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    fn created_subscription(entity: InsertSubscriptionEntity) -> SubscriptionEntity {
        SubscriptionEntity {
            id: entity.id,
            user_id: entity.user_id,
            plan: entity.plan,
            status: entity.status,
            start_date: entity.start_date,
            end_date: entity.end_date,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }

    fn usecase(
        payment_repo: MockPaymentRepository,
        subscription_repo: MockSubscriptionRepository,
        gateway: Option<MockPaymentGateway>,
    ) -> SubscriptionUseCase<MockPaymentRepository, MockSubscriptionRepository> {
        let mut gateways: PaymentGateways = HashMap::new();
        if let Some(gateway) = gateway {
            gateways.insert(PaymentMethod::Stripe, Arc::new(gateway));
        }

        SubscriptionUseCase::new(
            Arc::new(payment_repo),
            Arc::new(subscription_repo),
            gateways,
            QuotaPolicy::default(),
        )
    }

    #[tokio::test]
    async fn duplicate_completion_creates_exactly_one_subscription() {
        let payment_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let linked: Arc<Mutex<Option<Uuid>>> = Arc::new(Mutex::new(None));

        let mut payment_repo = MockPaymentRepository::new();
        let state = Arc::clone(&linked);
        payment_repo.expect_find_by_id().returning(move |id| {
            let current = payment(id, user_id, *state.lock().unwrap());
            Box::pin(async move { Ok(Some(current)) })
        });
        let state = Arc::clone(&linked);
        payment_repo
            .expect_mark_completed()
            .with(eq(payment_id), eq(Some("pi_123".to_string())))
            .times(2)
            .returning(move |id, _| {
                let mut current = payment(id, user_id, *state.lock().unwrap());
                current.status = "COMPLETED".to_string();
                Box::pin(async move { Ok(Some(current)) })
            });
        let state = Arc::clone(&linked);
        payment_repo
            .expect_grant_subscription_if_unlinked()
            .withf(move |_, entity| {
                entity.user_id == user_id
                    && entity.plan == "PREMIUM"
                    && entity.status == "ACTIVE"
                    && entity.end_date - entity.start_date == Duration::days(30)
            })
            .times(1)
            .returning(move |_, entity| {
                let mut guard = state.lock().unwrap();
                let granted = guard.is_none().then(|| created_subscription(entity));
                if let Some(subscription) = &granted {
                    *guard = Some(subscription.id);
                }
                Box::pin(async move { Ok(granted) })
            });

        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo.expect_create().never();

        let usecase = usecase(payment_repo, subscription_repo, None);
        usecase
            .complete_payment(payment_id, Some("pi_123".to_string()))
            .await
            .unwrap();
        usecase
            .complete_payment(payment_id, Some("pi_123".to_string()))
            .await
            .unwrap();

        assert!(linked.lock().unwrap().is_some());
    }

    #[tokio::test]
    async fn losing_the_link_race_creates_nothing() {
        let payment_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();

        let mut payment_repo = MockPaymentRepository::new();
        payment_repo.expect_find_by_id().returning(move |id| {
            let current = payment(id, user_id, None);
            Box::pin(async move { Ok(Some(current)) })
        });
        payment_repo
            .expect_mark_completed()
            .returning(move |id, _| {
                let current = payment(id, user_id, None);
                Box::pin(async move { Ok(Some(current)) })
            });
        payment_repo
            .expect_grant_subscription_if_unlinked()
            .returning(|_, _| Box::pin(async { Ok(None) }));

        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo.expect_create().never();

        usecase(payment_repo, subscription_repo, None)
            .complete_payment(payment_id, None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn completion_for_unknown_payment_is_dropped() {
        let mut payment_repo = MockPaymentRepository::new();
        payment_repo
            .expect_find_by_id()
            .returning(|_| Box::pin(async { Ok(None) }));
        payment_repo.expect_mark_completed().never();

        let result = usecase(payment_repo, MockSubscriptionRepository::new(), None)
            .complete_payment(Uuid::new_v4(), Some("pi_404".to_string()))
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn failed_grant_is_retried_by_the_next_delivery() {
        let payment_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let linked: Arc<Mutex<Option<Uuid>>> = Arc::new(Mutex::new(None));
        let attempts = Arc::new(Mutex::new(0_u32));

        let mut payment_repo = MockPaymentRepository::new();
        let state = Arc::clone(&linked);
        payment_repo.expect_find_by_id().returning(move |id| {
            let current = payment(id, user_id, *state.lock().unwrap());
            Box::pin(async move { Ok(Some(current)) })
        });
        let state = Arc::clone(&linked);
        payment_repo.expect_mark_completed().returning(move |id, _| {
            let current = payment(id, user_id, *state.lock().unwrap());
            Box::pin(async move { Ok(Some(current)) })
        });
        let state = Arc::clone(&linked);
        let counter = Arc::clone(&attempts);
        payment_repo
            .expect_grant_subscription_if_unlinked()
            .times(2)
            .returning(move |_, entity| {
                let mut attempts = counter.lock().unwrap();
                *attempts += 1;
                // The first transaction rolls back, so the payment stays unlinked.
                let result = if *attempts == 1 {
                    Err(anyhow!("connection reset"))
                } else {
                    let subscription = created_subscription(entity);
                    *state.lock().unwrap() = Some(subscription.id);
                    Ok(Some(subscription))
                };
                Box::pin(async move { result })
            });

        let usecase = usecase(payment_repo, MockSubscriptionRepository::new(), None);

        let first = usecase.complete_payment(payment_id, None).await;
        assert!(matches!(first, Err(UseCaseError::Internal(_))));
        assert!(linked.lock().unwrap().is_none());

        usecase.complete_payment(payment_id, None).await.unwrap();
        assert!(linked.lock().unwrap().is_some());
        assert_eq!(*attempts.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn rejected_signature_changes_nothing() {
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_parse_webhook().returning(|_| {
            Box::pin(async { Err(WebhookError::InvalidSignature("signature mismatch".to_string())) })
        });

        let mut payment_repo = MockPaymentRepository::new();
        payment_repo.expect_find_by_id().never();
        payment_repo.expect_mark_completed().never();
        payment_repo.expect_mark_failed().never();

        let result = usecase(payment_repo, MockSubscriptionRepository::new(), Some(gateway))
            .handle_webhook(
                PaymentMethod::Stripe,
                WebhookDelivery {
                    payload: b"{}".to_vec(),
                    signature: None,
                },
            )
            .await;

        assert!(matches!(result, Err(UseCaseError::InvalidSignature(_))));
    }

    #[tokio::test]
    async fn expired_checkout_fails_the_payment() {
        let payment_id = Uuid::new_v4();
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_parse_webhook().returning(move |_| {
            Box::pin(async move { Ok(ProviderEvent::PaymentFailed { payment_id }) })
        });

        let mut payment_repo = MockPaymentRepository::new();
        payment_repo
            .expect_mark_failed()
            .with(eq(payment_id))
            .times(1)
            .returning(|_| Box::pin(async { Ok(None) }));

        usecase(payment_repo, MockSubscriptionRepository::new(), Some(gateway))
            .handle_webhook(
                PaymentMethod::Stripe,
                WebhookDelivery {
                    payload: b"{}".to_vec(),
                    signature: Some("t=1,v1=00".to_string()),
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn checkout_is_refused_for_subscribed_users() {
        let user_id = Uuid::new_v4();
        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_find_active_by_user()
            .returning(move |user_id, now| {
                let active = created_subscription(InsertSubscriptionEntity {
                    id: Uuid::new_v4(),
                    user_id,
                    plan: "PREMIUM".to_string(),
                    status: "ACTIVE".to_string(),
                    start_date: now,
                    end_date: now + Duration::days(5),
                    created_at: now,
                    updated_at: now,
                });
                Box::pin(async move { Ok(Some(active)) })
            });

        let mut payment_repo = MockPaymentRepository::new();
        payment_repo.expect_create().never();

        let result = usecase(payment_repo, subscription_repo, Some(MockPaymentGateway::new()))
            .create_checkout(user_id, PaymentMethod::Stripe, "https://app.test/ok".to_string(), None)
            .await;

        assert!(matches!(result, Err(UseCaseError::Conflict(_))));
    }

    #[tokio::test]
    async fn provider_failure_leaves_the_payment_pending() {
        let user_id = Uuid::new_v4();
        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_find_active_by_user()
            .returning(|_, _| Box::pin(async { Ok(None) }));

        let mut payment_repo = MockPaymentRepository::new();
        payment_repo
            .expect_create()
            .withf(|entity| entity.status == "PENDING" && entity.amount_minor == 1999)
            .times(1)
            .returning(move |entity| {
                let mut created = payment(Uuid::new_v4(), entity.user_id, None);
                created.provider_reference = None;
                Box::pin(async move { Ok(created) })
            });
        payment_repo.expect_set_provider_reference().never();

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_create_checkout()
            .returning(|_| Box::pin(async { Err(anyhow!("stripe returned 500")) }));

        let result = usecase(payment_repo, subscription_repo, Some(gateway))
            .create_checkout(user_id, PaymentMethod::Stripe, "https://app.test/ok".to_string(), None)
            .await;

        assert!(matches!(result, Err(UseCaseError::ProviderUnavailable(_))));
    }

    #[tokio::test]
    async fn checkout_stores_the_provider_reference() {
        let user_id = Uuid::new_v4();
        let payment_id = Uuid::new_v4();
        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_find_active_by_user()
            .returning(|_, _| Box::pin(async { Ok(None) }));

        let mut payment_repo = MockPaymentRepository::new();
        payment_repo.expect_create().returning(move |entity| {
            let created = payment(payment_id, entity.user_id, None);
            Box::pin(async move { Ok(created) })
        });
        payment_repo
            .expect_set_provider_reference()
            .with(eq(payment_id), eq("cs_live_1".to_string()))
            .times(1)
            .returning(|_, _| Box::pin(async { Ok(()) }));

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_create_checkout()
            .withf(move |request| request.payment_id == payment_id && request.user_id == user_id)
            .returning(|_| {
                Box::pin(async {
                    Ok(CheckoutSession {
                        redirect_url: "https://checkout.stripe.test/cs_live_1".to_string(),
                        provider_reference: "cs_live_1".to_string(),
                    })
                })
            });

        let dto = usecase(payment_repo, subscription_repo, Some(gateway))
            .create_checkout(user_id, PaymentMethod::Stripe, "https://app.test/ok".to_string(), None)
            .await
            .unwrap();

        assert_eq!(dto.payment_id, payment_id);
        assert_eq!(dto.url, "https://checkout.stripe.test/cs_live_1");
    }

    #[tokio::test]
    async fn unconfigured_provider_is_unavailable() {
        let result = usecase(
            MockPaymentRepository::new(),
            MockSubscriptionRepository::new(),
            None,
        )
        .create_checkout(
            Uuid::new_v4(),
            PaymentMethod::Square,
            "https://app.test/ok".to_string(),
            None,
        )
        .await;

        assert!(matches!(result, Err(UseCaseError::ProviderUnavailable(_))));
    }
}
