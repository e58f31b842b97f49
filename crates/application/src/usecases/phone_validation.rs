use std::sync::Arc;

use chrono::Utc;
use futures_util::future::join_all;
use tracing::{error, info};
use uuid::Uuid;

use domain::{
    repositories::{
        subscriptions::SubscriptionRepository, validation_histories::ValidationHistoryRepository,
    },
    value_objects::{
        enums::validation_types::ValidationType,
        phone_validation::{
            BulkValidationPolicy, BulkValidationSummary, PhoneValidationResult,
            ValidationHistoryModel,
        },
    },
};

use crate::errors::{UseCaseError, UseCaseResult};
use crate::interfaces::{phone_lookup::PhoneLookupClient, validation_archive::ValidationArchive};
use crate::usecases::{quota::QuotaEngine, usage_ledger::UsageLedger};

/// Reduces user input to the digits sent to the lookup provider, without the leading `+`.
///
/// Separators (whitespace, dashes, parentheses, dots) are removed first. An explicit
/// `+` means the caller already supplied a country code. Otherwise a single trunk `0`
/// is dropped and a bare 10-digit number is assumed to be North American.
pub fn normalize_phone_number(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '-' | '(' | ')' | '.'))
        .collect();

    if let Some(rest) = cleaned.strip_prefix('+') {
        return rest.chars().filter(|c| c.is_ascii_digit()).collect();
    }

    let digits: String = cleaned.chars().filter(|c| c.is_ascii_digit()).collect();
    let digits = digits.strip_prefix('0').unwrap_or(&digits);

    if digits.len() == 10 && !digits.starts_with('1') {
        return format!("1{digits}");
    }

    digits.to_string()
}

pub struct PhoneValidationUseCase<L, A, S, V>
where
    L: PhoneLookupClient + 'static,
    A: ValidationArchive + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    V: ValidationHistoryRepository + Send + Sync + 'static,
{
    lookup_client: Arc<L>,
    archive: Arc<A>,
    quota_engine: Arc<QuotaEngine<S, V>>,
    usage_ledger: Arc<UsageLedger<V>>,
    policy: BulkValidationPolicy,
}

impl<L, A, S, V> PhoneValidationUseCase<L, A, S, V>
where
    L: PhoneLookupClient + 'static,
    A: ValidationArchive + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    V: ValidationHistoryRepository + Send + Sync + 'static,
{
    pub fn new(
        lookup_client: Arc<L>,
        archive: Arc<A>,
        quota_engine: Arc<QuotaEngine<S, V>>,
        usage_ledger: Arc<UsageLedger<V>>,
        policy: BulkValidationPolicy,
    ) -> Self {
        Self {
            lookup_client,
            archive,
            quota_engine,
            usage_ledger,
            policy,
        }
    }

    pub async fn validate_single(
        &self,
        user_id: Uuid,
        phone_number: Option<String>,
    ) -> UseCaseResult<PhoneValidationResult> {
        let phone_number = phone_number.unwrap_or_default();
        if phone_number.trim().is_empty() {
            return Err(UseCaseError::BadRequest("Phone number is required".to_string()));
        }

        self.quota_engine.check_batch(user_id, 1).await?;

        let result = self.validate_one(phone_number).await;
        self.archive_and_record(user_id, ValidationType::Single, vec![result.clone()])
            .await?;

        Ok(result)
    }

    pub async fn validate_bulk(
        &self,
        user_id: Uuid,
        phone_numbers: Vec<String>,
    ) -> UseCaseResult<BulkValidationSummary> {
        self.validate_batch(user_id, phone_numbers, ValidationType::Bulk)
            .await
    }

    /// Validates a batch in provider-friendly chunks. The quota decision covers the
    /// whole batch before any lookup is made.
    pub async fn validate_batch(
        &self,
        user_id: Uuid,
        phone_numbers: Vec<String>,
        validation_type: ValidationType,
    ) -> UseCaseResult<BulkValidationSummary> {
        if phone_numbers.is_empty() {
            return Err(UseCaseError::BadRequest(
                "Phone numbers array is required".to_string(),
            ));
        }

        let max_batch = validation_type.max_batch();
        if phone_numbers.len() > max_batch {
            return Err(UseCaseError::BadRequest(format!(
                "Maximum {max_batch} phone numbers allowed per request"
            )));
        }

        let requested = phone_numbers.len();
        self.quota_engine
            .check_batch(user_id, requested as i64)
            .await?;

        info!(%user_id, %validation_type, requested, "phone_validation: batch started");
        let results = self.validate_chunked(phone_numbers).await;
        self.archive_and_record(user_id, validation_type, results.clone())
            .await?;

        let summary = BulkValidationSummary::new(results, Utc::now());
        info!(
            %user_id,
            total = summary.total,
            valid = summary.valid,
            invalid = summary.invalid,
            unknown = summary.unknown,
            "phone_validation: batch finished"
        );
        Ok(summary)
    }

    pub async fn history(&self, user_id: Uuid) -> UseCaseResult<Vec<ValidationHistoryModel>> {
        self.usage_ledger.history(user_id).await
    }

    async fn validate_chunked(&self, phone_numbers: Vec<String>) -> Vec<PhoneValidationResult> {
        let chunk_size = self.policy.chunk_size.max(1);
        let chunk_count = phone_numbers.len().div_ceil(chunk_size);
        let mut results = Vec::with_capacity(phone_numbers.len());

        for (index, chunk) in phone_numbers.chunks(chunk_size).enumerate() {
            let chunk_results = join_all(
                chunk
                    .iter()
                    .cloned()
                    .map(|phone_number| self.validate_one(phone_number)),
            )
            .await;
            results.extend(chunk_results);

            if index + 1 < chunk_count && !self.policy.chunk_delay.is_zero() {
                tokio::time::sleep(self.policy.chunk_delay).await;
            }
        }

        results
    }

    async fn validate_one(&self, phone_number: String) -> PhoneValidationResult {
        if phone_number.trim().is_empty() {
            return PhoneValidationResult::empty(phone_number, Utc::now());
        }

        let normalized = normalize_phone_number(&phone_number);
        let outcome = self.lookup_client.lookup(normalized.clone()).await;
        PhoneValidationResult::from_outcome(normalized, outcome, Utc::now())
    }

    async fn archive_and_record(
        &self,
        user_id: Uuid,
        validation_type: ValidationType,
        results: Vec<PhoneValidationResult>,
    ) -> UseCaseResult<ValidationHistoryModel> {
        let total = results.len();
        let file_path = self
            .archive
            .store(user_id, validation_type, results)
            .await
            .map_err(|err| {
                error!(%user_id, %validation_type, error = ?err, "phone_validation: failed to archive results");
                UseCaseError::Internal(err)
            })?;

        self.usage_ledger
            .record(user_id, validation_type, file_path, total)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use domain::{
        entities::validation_histories::ValidationHistoryEntity,
        repositories::{
            subscriptions::MockSubscriptionRepository,
            validation_histories::MockValidationHistoryRepository,
        },
        value_objects::{
            phone_validation::{PhoneLookupOutcome, ValidationStatus},
            quota::QuotaPolicy,
        },
    };

    use crate::interfaces::{
        phone_lookup::MockPhoneLookupClient, validation_archive::MockValidationArchive,
    };

    type TestUseCase = PhoneValidationUseCase<
        MockPhoneLookupClient,
        MockValidationArchive,
        MockSubscriptionRepository,
        MockValidationHistoryRepository,
    >;

    fn history_repo(used: i64, expected_total: Option<i32>) -> MockValidationHistoryRepository {
        let mut repo = MockValidationHistoryRepository::new();
        repo.expect_sum_total_by_user()
            .returning(move |_| Box::pin(async move { Ok(used) }));

        match expected_total {
            Some(expected_total) => {
                repo.expect_create()
                    .withf(move |entry| entry.total == expected_total)
                    .times(1)
                    .returning(|entry| {
                        Box::pin(async move {
                            Ok(ValidationHistoryEntity {
                                id: Uuid::new_v4(),
                                user_id: entry.user_id,
                                type_: entry.type_,
                                file_path: entry.file_path,
                                total: entry.total,
                                created_at: entry.created_at,
                            })
                        })
                    });
            }
            None => {
                repo.expect_create().never();
            }
        }

        repo
    }

    fn usecase(
        lookup_client: MockPhoneLookupClient,
        archive: MockValidationArchive,
        history_repo: MockValidationHistoryRepository,
    ) -> TestUseCase {
        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_find_active_by_user()
            .returning(|_, _| Box::pin(async { Ok(None) }));

        let usage_ledger = Arc::new(UsageLedger::new(Arc::new(history_repo)));
        let quota_engine = Arc::new(QuotaEngine::new(
            Arc::new(subscription_repo),
            Arc::clone(&usage_ledger),
            QuotaPolicy {
                free_limit: 100,
                ..QuotaPolicy::default()
            },
        ));

        PhoneValidationUseCase::new(
            Arc::new(lookup_client),
            Arc::new(archive),
            quota_engine,
            usage_ledger,
            BulkValidationPolicy {
                chunk_size: 10,
                chunk_delay: Duration::ZERO,
            },
        )
    }

    fn archive_expecting(count: usize) -> MockValidationArchive {
        let mut archive = MockValidationArchive::new();
        archive
            .expect_store()
            .withf(move |_, _, results| results.len() == count)
            .times(1)
            .returning(|_, _, _| Box::pin(async { Ok("2026/10/VNC1610261200.json".to_string()) }));
        archive
    }

    #[test]
    fn normalizes_common_input_shapes() {
        assert_eq!(normalize_phone_number("+44 20 7946 0958"), "442079460958");
        assert_eq!(normalize_phone_number("(555) 123-4567"), "15551234567");
        assert_eq!(normalize_phone_number("1-555-123-4567"), "15551234567");
        assert_eq!(normalize_phone_number("0555.123.4567"), "15551234567");
        assert_eq!(normalize_phone_number("555-1234"), "5551234");
        assert_eq!(normalize_phone_number("tel: 555 123 4567"), "15551234567");
    }

    #[test]
    fn international_numbers_keep_digits_only() {
        assert_eq!(normalize_phone_number("+1?Fields=sim_swap"), "1");
        assert_eq!(normalize_phone_number("+44#frag"), "44");
        assert_eq!(normalize_phone_number("+1/../../v1/Foo"), "11");
        assert_eq!(normalize_phone_number("+1 555 123 4567&x=y"), "15551234567");
    }

    #[tokio::test]
    async fn bulk_results_keep_input_order_across_chunks() {
        let numbers: Vec<String> = (0..25).map(|i| format!("+1555000{i:04}")).collect();

        let mut lookup_client = MockPhoneLookupClient::new();
        lookup_client
            .expect_lookup()
            .times(25)
            .returning(|number| {
                let even = number
                    .chars()
                    .last()
                    .and_then(|c| c.to_digit(10))
                    .is_some_and(|d| d % 2 == 0);
                Box::pin(async move {
                    if even {
                        PhoneLookupOutcome::Valid {
                            country_code: Some("US".to_string()),
                            formatted_number: Some(format!("+{number}")),
                            national_format: None,
                        }
                    } else {
                        PhoneLookupOutcome::Invalid { country_code: None }
                    }
                })
            });

        let summary = usecase(lookup_client, archive_expecting(25), history_repo(0, Some(25)))
            .validate_bulk(Uuid::new_v4(), numbers.clone())
            .await
            .unwrap();

        assert_eq!(summary.total, 25);
        assert_eq!(summary.valid, 13);
        assert_eq!(summary.invalid, 12);
        let returned: Vec<String> = summary
            .results
            .iter()
            .map(|r| format!("+{}", r.phone_number))
            .collect();
        assert_eq!(returned, numbers);
    }

    #[tokio::test]
    async fn provider_outage_is_reported_as_unknown() {
        let mut lookup_client = MockPhoneLookupClient::new();
        lookup_client.expect_lookup().returning(|_| {
            Box::pin(async {
                PhoneLookupOutcome::Unavailable {
                    reason: "lookup provider not configured".to_string(),
                }
            })
        });

        let result = usecase(lookup_client, archive_expecting(1), history_repo(0, Some(1)))
            .validate_single(Uuid::new_v4(), Some("+15551234567".to_string()))
            .await
            .unwrap();

        assert_eq!(result.status, ValidationStatus::Unknown);
        assert!(!result.is_valid);
    }

    #[tokio::test]
    async fn batch_over_remaining_free_tier_never_reaches_the_provider() {
        let mut lookup_client = MockPhoneLookupClient::new();
        lookup_client.expect_lookup().never();
        let mut archive = MockValidationArchive::new();
        archive.expect_store().never();

        let numbers = vec!["+15551234567".to_string(); 8];
        let result = usecase(lookup_client, archive, history_repo(95, None))
            .validate_bulk(Uuid::new_v4(), numbers)
            .await;

        assert!(matches!(result, Err(UseCaseError::QuotaExceeded(_))));
    }

    #[tokio::test]
    async fn empty_single_number_is_a_bad_request() {
        let result = usecase(
            MockPhoneLookupClient::new(),
            MockValidationArchive::new(),
            MockValidationHistoryRepository::new(),
        )
        .validate_single(Uuid::new_v4(), Some("  ".to_string()))
        .await;

        assert!(matches!(result, Err(UseCaseError::BadRequest(_))));
    }

    #[tokio::test]
    async fn oversized_bulk_request_is_a_bad_request() {
        let numbers = vec!["5551234567".to_string(); 1_001];
        let result = usecase(
            MockPhoneLookupClient::new(),
            MockValidationArchive::new(),
            MockValidationHistoryRepository::new(),
        )
        .validate_bulk(Uuid::new_v4(), numbers)
        .await;

        assert!(matches!(result, Err(UseCaseError::BadRequest(_))));
    }

    #[tokio::test]
    async fn blank_entries_in_a_batch_skip_the_provider() {
        let mut lookup_client = MockPhoneLookupClient::new();
        lookup_client.expect_lookup().times(1).returning(|_| {
            Box::pin(async {
                PhoneLookupOutcome::Valid {
                    country_code: None,
                    formatted_number: None,
                    national_format: None,
                }
            })
        });

        let summary = usecase(lookup_client, archive_expecting(2), history_repo(0, Some(2)))
            .validate_bulk(
                Uuid::new_v4(),
                vec!["".to_string(), "+15551234567".to_string()],
            )
            .await
            .unwrap();

        assert_eq!(summary.invalid, 1);
        assert_eq!(summary.valid, 1);
    }
}
