use super::RequestsLoggingLevel;
use crate::user::auth::DEFAULT_TOKEN_TTL_HOURS;

#[derive(Clone)]
pub struct ServerConfig {
    pub requests_logging_level: RequestsLoggingLevel,
    pub port: u16,
    /// Port of the Prometheus endpoint, served apart from the API.
    pub metrics_port: u16,
    pub jwt_secret: String,
    pub token_ttl_hours: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            requests_logging_level: RequestsLoggingLevel::Path,
            port: 3000,
            metrics_port: 9091,
            jwt_secret: String::new(),
            token_ttl_hours: DEFAULT_TOKEN_TTL_HOURS,
        }
    }
}
