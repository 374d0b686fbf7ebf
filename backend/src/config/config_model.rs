use crates::domain::value_objects::time_grid::BusinessHours;
use url::Url;

use super::stage::Stage;

#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub backend_server: BackendServer,
    pub database: Database,
    pub auth: AuthSecret,
    pub stripe: Stripe,
    pub scheduling: Scheduling,
    pub notifications: Notifications,
    pub cache: Cache,
    pub stage: Stage,
}

#[derive(Debug, Clone)]
pub struct BackendServer {
    pub port: u16,
    pub body_limit: u64,
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct AuthSecret {
    pub jwt_secret: String,
}

#[derive(Debug, Clone)]
pub struct Stripe {
    pub secret_key: String,
    pub webhook_secret: String,
    pub success_url: String,
    pub cancel_url: String,
    pub currency: String,
    pub webhook_tolerance_seconds: i64,
}

#[derive(Debug, Clone)]
pub struct Scheduling {
    pub business_hours: BusinessHours,
    pub enforce_monthly_booking_limit: bool,
}

#[derive(Debug, Clone)]
pub struct Notifications {
    pub webhook_url: Option<Url>,
}

#[derive(Debug, Clone)]
pub struct Cache {
    pub ttl_seconds: u64,
    pub max_entries: usize,
}
