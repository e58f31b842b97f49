use std::time::Duration;

use domain::value_objects::sweeps::RetentionPolicy;

#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub worker_server: WorkerServer,
    pub database: Database,
    pub sweeps: Sweeps,
}

#[derive(Debug, Clone)]
pub struct WorkerServer {
    pub port: u16,
    pub timeout: u64,
    pub body_limit: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct Sweeps {
    /// Internal sweep routes answer 503 while this is unset.
    pub internal_token: Option<String>,
    pub retention: RetentionPolicy,
    pub contact_interval: Duration,
    pub subscription_interval: Duration,
}
