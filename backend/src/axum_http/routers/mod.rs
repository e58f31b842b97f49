pub mod contacts;
pub mod phone_validation;
pub mod subscriptions;
pub mod webhooks;
