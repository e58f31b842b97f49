pub mod errors;
pub mod interfaces;
pub mod usecases;
