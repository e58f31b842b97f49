use domain::value_objects::{phone_validation::BulkValidationPolicy, quota::QuotaPolicy};
use infra::providers::{
    square_gateway::SquareSettings, stripe_gateway::StripeSettings,
    twilio_lookup::TwilioCredentials,
};

#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub backend_server: BackendServer,
    pub database: Database,
    pub auth: Auth,
    pub quota: QuotaPolicy,
    pub bulk_validation: BulkValidationPolicy,
    pub validation_archive: ValidationArchiveConfig,
    pub twilio: Option<TwilioCredentials>,
    pub stripe: Option<StripeSettings>,
    pub square: Option<SquareSettings>,
}

#[derive(Debug, Clone)]
pub struct BackendServer {
    pub port: u16,
    /// MiB
    pub body_limit: u64,
    /// Seconds
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct Auth {
    pub jwt_secret: String,
}

#[derive(Debug, Clone)]
pub struct ValidationArchiveConfig {
    pub dir: String,
    pub prefix: String,
}
