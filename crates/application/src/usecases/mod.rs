pub mod contacts;
pub mod phone_validation;
pub mod quota;
pub mod subscriptions;
pub mod usage_ledger;
