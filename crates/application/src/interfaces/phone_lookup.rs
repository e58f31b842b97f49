use async_trait::async_trait;

use domain::value_objects::phone_validation::PhoneLookupOutcome;

#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait PhoneLookupClient: Send + Sync {
    /// `phone_number` is already normalized: digits only, no leading `+`.
    async fn lookup(&self, phone_number: String) -> PhoneLookupOutcome;
}
