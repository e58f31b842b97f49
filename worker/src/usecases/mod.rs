pub mod contact_retention;
pub mod subscription_expiry;
