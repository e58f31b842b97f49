pub mod contact_phases;
pub mod contact_types;
pub mod payment_methods;
pub mod payment_statuses;
pub mod subscription_plans;
pub mod subscription_statuses;
pub mod validation_types;
