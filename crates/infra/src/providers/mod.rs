pub mod square_gateway;
pub mod stripe_gateway;
pub mod twilio_lookup;
