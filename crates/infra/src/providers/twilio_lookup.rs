use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::{error, warn};

use application::interfaces::phone_lookup::PhoneLookupClient;
use domain::value_objects::phone_validation::PhoneLookupOutcome;

const TWILIO_LOOKUP_BASE_URL: &str = "https://lookups.twilio.com";
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct TwilioCredentials {
    pub account_sid: String,
    pub auth_token: String,
}

/// Twilio Lookup v2 over plain reqwest. Without credentials every lookup is
/// `Unavailable`, never `Invalid`.
pub struct TwilioLookupClient {
    http: reqwest::Client,
    credentials: Option<TwilioCredentials>,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    valid: Option<bool>,
    country_code: Option<String>,
    phone_number: Option<String>,
    national_format: Option<String>,
}

impl TwilioLookupClient {
    pub fn new(credentials: Option<TwilioCredentials>) -> Self {
        if credentials.is_none() {
            warn!("twilio_lookup: credentials missing, phone lookups will report unknown");
        }

        Self {
            http: reqwest::Client::new(),
            credentials,
            base_url: TWILIO_LOOKUP_BASE_URL.to_string(),
        }
    }

    /// `None` unless the number is a non-empty run of ASCII digits.
    fn lookup_url(&self, phone_number: &str) -> Option<Url> {
        if phone_number.is_empty() || !phone_number.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }

        let number = format!("+{phone_number}");
        let mut url = Url::parse(&self.base_url).ok()?;
        url.path_segments_mut()
            .ok()?
            .pop_if_empty()
            .extend(["v2", "PhoneNumbers", number.as_str()]);
        Some(url)
    }

    fn outcome_from(status: StatusCode, body: Option<LookupResponse>) -> PhoneLookupOutcome {
        if status == StatusCode::NOT_FOUND {
            return PhoneLookupOutcome::Invalid { country_code: None };
        }

        if !status.is_success() {
            return PhoneLookupOutcome::Unavailable {
                reason: format!("lookup provider answered {status}"),
            };
        }

        match body {
            Some(LookupResponse {
                valid: Some(true),
                country_code,
                phone_number,
                national_format,
            }) => PhoneLookupOutcome::Valid {
                country_code,
                formatted_number: phone_number,
                national_format,
            },
            Some(response) => PhoneLookupOutcome::Invalid {
                country_code: response.country_code,
            },
            None => PhoneLookupOutcome::Unavailable {
                reason: "lookup provider sent an unreadable body".to_string(),
            },
        }
    }
}

#[async_trait]
impl PhoneLookupClient for TwilioLookupClient {
    async fn lookup(&self, phone_number: String) -> PhoneLookupOutcome {
        let Some(credentials) = self.credentials.as_ref() else {
            return PhoneLookupOutcome::Unavailable {
                reason: "phone lookup provider is not configured".to_string(),
            };
        };

        let Some(url) = self.lookup_url(&phone_number) else {
            return PhoneLookupOutcome::Invalid { country_code: None };
        };

        let resp = match self
            .http
            .get(url)
            .timeout(LOOKUP_TIMEOUT)
            .basic_auth(&credentials.account_sid, Some(&credentials.auth_token))
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(err) => {
                error!(error = ?err, "twilio_lookup: request failed");
                return PhoneLookupOutcome::Unavailable {
                    reason: "lookup provider unreachable".to_string(),
                };
            }
        };

        let status = resp.status();
        let body = if status.is_success() {
            match resp.json::<LookupResponse>().await {
                Ok(body) => Some(body),
                Err(err) => {
                    error!(error = ?err, "twilio_lookup: failed to decode response");
                    None
                }
            }
        } else {
            if status != StatusCode::NOT_FOUND {
                warn!(status = %status, "twilio_lookup: unexpected status");
            }
            None
        };

        Self::outcome_from(status, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_means_invalid_number() {
        let outcome = TwilioLookupClient::outcome_from(StatusCode::NOT_FOUND, None);
        assert_eq!(outcome, PhoneLookupOutcome::Invalid { country_code: None });
    }

    #[test]
    fn server_errors_are_unavailable() {
        let outcome = TwilioLookupClient::outcome_from(StatusCode::SERVICE_UNAVAILABLE, None);
        assert!(matches!(outcome, PhoneLookupOutcome::Unavailable { .. }));
    }

    #[test]
    fn body_validity_decides_the_outcome() {
        let body: LookupResponse = serde_json::from_str(
            r#"{"valid":true,"country_code":"US","phone_number":"+15551234567","national_format":"(555) 123-4567","calling_country_code":"1"}"#,
        )
        .unwrap();
        let outcome = TwilioLookupClient::outcome_from(StatusCode::OK, Some(body));
        assert_eq!(
            outcome,
            PhoneLookupOutcome::Valid {
                country_code: Some("US".to_string()),
                formatted_number: Some("+15551234567".to_string()),
                national_format: Some("(555) 123-4567".to_string()),
            }
        );

        let body: LookupResponse =
            serde_json::from_str(r#"{"valid":false,"country_code":"GB"}"#).unwrap();
        let outcome = TwilioLookupClient::outcome_from(StatusCode::OK, Some(body));
        assert_eq!(
            outcome,
            PhoneLookupOutcome::Invalid {
                country_code: Some("GB".to_string())
            }
        );
    }

    #[test]
    fn lookup_url_only_carries_digits() {
        let client = TwilioLookupClient::new(None);

        let url = client.lookup_url("15551234567").unwrap();
        assert_eq!(url.path(), "/v2/PhoneNumbers/+15551234567");
        assert_eq!(url.query(), None);

        assert!(client.lookup_url("1?Fields=sim_swap").is_none());
        assert!(client.lookup_url("44#frag").is_none());
        assert!(client.lookup_url("1/../v1/Foo").is_none());
        assert!(client.lookup_url("").is_none());
    }

    #[tokio::test]
    async fn non_digit_numbers_are_invalid_without_a_request() {
        let client = TwilioLookupClient::new(Some(TwilioCredentials {
            account_sid: "AC123".to_string(),
            auth_token: "token".to_string(),
        }));
        let outcome = client.lookup("1?Fields=sim_swap".to_string()).await;
        assert_eq!(outcome, PhoneLookupOutcome::Invalid { country_code: None });
    }

    #[tokio::test]
    async fn unconfigured_client_never_calls_out() {
        let client = TwilioLookupClient::new(None);
        let outcome = client.lookup("15551234567".to_string()).await;
        assert!(matches!(outcome, PhoneLookupOutcome::Unavailable { .. }));
    }
}
