pub mod contacts;
pub mod enums;
pub mod payments;
pub mod phone_validation;
pub mod quota;
pub mod subscriptions;
pub mod sweeps;
