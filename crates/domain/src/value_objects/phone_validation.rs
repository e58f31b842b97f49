use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::validation_histories::ValidationHistoryEntity;
use crate::value_objects::enums::validation_types::ValidationType;

pub const DEFAULT_BULK_CHUNK_SIZE: usize = 10;
pub const DEFAULT_BULK_CHUNK_DELAY_MS: u64 = 500;

/// Result of asking the lookup provider about one normalized number.
#[derive(Debug, Clone, PartialEq)]
pub enum PhoneLookupOutcome {
    Valid {
        country_code: Option<String>,
        formatted_number: Option<String>,
        national_format: Option<String>,
    },
    Invalid {
        country_code: Option<String>,
    },
    /// The provider could not answer. This is "could not validate", never "invalid".
    Unavailable {
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Valid,
    Invalid,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhoneValidationResult {
    pub phone_number: String,
    pub status: ValidationStatus,
    pub is_valid: bool,
    pub is_reachable: Option<bool>,
    pub country_code: Option<String>,
    pub formatted_number: Option<String>,
    pub national_format: Option<String>,
    pub error: Option<String>,
    pub validated_at: Option<DateTime<Utc>>,
}

impl PhoneValidationResult {
    pub fn from_outcome(
        phone_number: String,
        outcome: PhoneLookupOutcome,
        now: DateTime<Utc>,
    ) -> Self {
        match outcome {
            PhoneLookupOutcome::Valid {
                country_code,
                formatted_number,
                national_format,
            } => Self {
                formatted_number: formatted_number.or_else(|| Some(format!("+{phone_number}"))),
                phone_number,
                status: ValidationStatus::Valid,
                is_valid: true,
                is_reachable: Some(true),
                country_code,
                national_format,
                error: None,
                validated_at: Some(now),
            },
            PhoneLookupOutcome::Invalid { country_code } => Self {
                phone_number,
                status: ValidationStatus::Invalid,
                is_valid: false,
                is_reachable: None,
                country_code,
                formatted_number: None,
                national_format: None,
                error: None,
                validated_at: Some(now),
            },
            PhoneLookupOutcome::Unavailable { reason } => Self {
                phone_number,
                status: ValidationStatus::Unknown,
                is_valid: false,
                is_reachable: None,
                country_code: None,
                formatted_number: None,
                national_format: None,
                error: Some(reason),
                validated_at: None,
            },
        }
    }

    /// Empty input short-circuits without calling the provider.
    pub fn empty(raw: String, now: DateTime<Utc>) -> Self {
        Self {
            phone_number: raw,
            status: ValidationStatus::Invalid,
            is_valid: false,
            is_reachable: None,
            country_code: None,
            formatted_number: None,
            national_format: None,
            error: None,
            validated_at: Some(now),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BulkValidationSummary {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    pub unknown: usize,
    pub results: Vec<PhoneValidationResult>,
    pub processed_at: DateTime<Utc>,
}

impl BulkValidationSummary {
    pub fn new(results: Vec<PhoneValidationResult>, processed_at: DateTime<Utc>) -> Self {
        let count = |status: ValidationStatus| results.iter().filter(|r| r.status == status).count();

        Self {
            total: results.len(),
            valid: count(ValidationStatus::Valid),
            invalid: count(ValidationStatus::Invalid),
            unknown: count(ValidationStatus::Unknown),
            results,
            processed_at,
        }
    }
}

/// Rate-limiting courtesy towards the lookup provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkValidationPolicy {
    pub chunk_size: usize,
    pub chunk_delay: Duration,
}

impl Default for BulkValidationPolicy {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_BULK_CHUNK_SIZE,
            chunk_delay: Duration::from_millis(DEFAULT_BULK_CHUNK_DELAY_MS),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationHistoryModel {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub validation_type: Option<ValidationType>,
    pub file_path: String,
    pub total: i32,
    pub created_at: DateTime<Utc>,
}

impl From<ValidationHistoryEntity> for ValidationHistoryModel {
    fn from(value: ValidationHistoryEntity) -> Self {
        Self {
            id: value.id,
            user_id: value.user_id,
            validation_type: ValidationType::from_str(&value.type_),
            file_path: value.file_path,
            total: value.total,
            created_at: value.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SingleValidationModel {
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkValidationModel {
    #[serde(default)]
    pub phone_numbers: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_provider_is_unknown_not_invalid() {
        let result = PhoneValidationResult::from_outcome(
            "15551234567".to_string(),
            PhoneLookupOutcome::Unavailable {
                reason: "timeout".to_string(),
            },
            Utc::now(),
        );

        assert_eq!(result.status, ValidationStatus::Unknown);
        assert_eq!(result.error.as_deref(), Some("timeout"));
    }

    #[test]
    fn valid_result_falls_back_to_e164_formatting() {
        let result = PhoneValidationResult::from_outcome(
            "15551234567".to_string(),
            PhoneLookupOutcome::Valid {
                country_code: Some("US".to_string()),
                formatted_number: None,
                national_format: None,
            },
            Utc::now(),
        );

        assert!(result.is_valid);
        assert_eq!(result.formatted_number.as_deref(), Some("+15551234567"));
    }

    #[test]
    fn summary_counts_by_status() {
        let now = Utc::now();
        let results = vec![
            PhoneValidationResult::from_outcome(
                "1".to_string(),
                PhoneLookupOutcome::Valid {
                    country_code: None,
                    formatted_number: None,
                    national_format: None,
                },
                now,
            ),
            PhoneValidationResult::from_outcome(
                "2".to_string(),
                PhoneLookupOutcome::Invalid { country_code: None },
                now,
            ),
            PhoneValidationResult::from_outcome(
                "3".to_string(),
                PhoneLookupOutcome::Unavailable {
                    reason: "down".to_string(),
                },
                now,
            ),
            PhoneValidationResult::empty(String::new(), now),
        ];

        let summary = BulkValidationSummary::new(results, now);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.valid, 1);
        assert_eq!(summary.invalid, 2);
        assert_eq!(summary.unknown, 1);
    }
}
