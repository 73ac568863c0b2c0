//! Order service configuration

use shared::config::{BrokerConfig, RegistryConfig, env_string};
use shared::error::AppResult;

#[derive(Debug, Clone)]
pub struct Config {
    /// RPC listen and advertised address (env: GRPC_ADDR)
    pub rpc_addr: String,
    pub registry: RegistryConfig,
    pub broker: BrokerConfig,
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        Ok(Self {
            rpc_addr: env_string("GRPC_ADDR", "localhost:8001"),
            registry: RegistryConfig::from_env()?,
            broker: BrokerConfig::from_env()?,
        })
    }
}
