pub mod contacts;
pub mod payments;
pub mod subscriptions;
pub mod user_records;
pub mod validation_histories;
