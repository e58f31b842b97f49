pub mod payment_gateway;
pub mod phone_lookup;
pub mod validation_archive;
