//! Stock service configuration

use shared::config::{BrokerConfig, ProcessorKind, RegistryConfig, env_string, require_env};
use shared::error::AppResult;

/// Processor mirroring the catalog, with its credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessorConfig {
    Memory,
    Stripe { secret_key: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// RPC listen and advertised address (env: GRPC_ADDR)
    pub rpc_addr: String,
    /// Catalog HTTP listen address (env: HTTP_ADDR)
    pub http_addr: String,
    pub processor: ProcessorConfig,
    pub registry: RegistryConfig,
    pub broker: BrokerConfig,
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        let processor = match env_string("PROCESSOR", "stripe").parse::<ProcessorKind>()? {
            ProcessorKind::Memory => ProcessorConfig::Memory,
            ProcessorKind::Stripe => ProcessorConfig::Stripe {
                secret_key: require_env("STRIPE_SECRET_KEY")?,
            },
        };

        Ok(Self {
            rpc_addr: env_string("GRPC_ADDR", "localhost:8003"),
            http_addr: env_string("HTTP_ADDR", "0.0.0.0:8083"),
            processor,
            registry: RegistryConfig::from_env()?,
            broker: BrokerConfig::from_env()?,
        })
    }
}
