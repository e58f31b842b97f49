pub mod observability;
pub mod postgres;
pub mod providers;
pub mod storage;
