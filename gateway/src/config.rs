//! Gateway configuration

use shared::config::{RegistryConfig, env_string};
use shared::error::AppResult;

#[derive(Debug, Clone)]
pub struct Config {
    /// Listen and advertised address (env: HTTP_ADDR)
    pub http_addr: String,
    /// Base URL customers are redirected to (env: GATEWAY_HTTP_ADDR)
    pub public_addr: String,
    pub registry: RegistryConfig,
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        Ok(Self {
            http_addr: env_string("HTTP_ADDR", "localhost:8080"),
            public_addr: env_string("GATEWAY_HTTP_ADDR", "http://localhost:8080"),
            registry: RegistryConfig::from_env()?,
        })
    }
}
