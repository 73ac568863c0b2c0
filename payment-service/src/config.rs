//! Payment service configuration

use shared::config::{BrokerConfig, ProcessorKind, RegistryConfig, env_string, require_env};
use shared::error::AppResult;

/// Processor issuing checkout links, with its credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessorConfig {
    Memory,
    Stripe { secret_key: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Webhook listen and advertised address (env: HTTP_ADDR)
    pub http_addr: String,
    /// Public gateway base used in checkout redirect URLs (env: GATEWAY_HTTP_ADDR)
    pub gateway_addr: String,
    /// Stripe webhook signing secret (env: STRIPE_ENDPOINT_SECRET)
    pub endpoint_secret: String,
    pub processor: ProcessorConfig,
    pub registry: RegistryConfig,
    pub broker: BrokerConfig,
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        let (processor, endpoint_secret) =
            match env_string("PROCESSOR", "stripe").parse::<ProcessorKind>()? {
                ProcessorKind::Memory => (
                    ProcessorConfig::Memory,
                    env_string("STRIPE_ENDPOINT_SECRET", "whsec_local"),
                ),
                ProcessorKind::Stripe => (
                    ProcessorConfig::Stripe {
                        secret_key: require_env("STRIPE_SECRET_KEY")?,
                    },
                    require_env("STRIPE_ENDPOINT_SECRET")?,
                ),
            };

        Ok(Self {
            http_addr: env_string("HTTP_ADDR", "localhost:8079"),
            gateway_addr: env_string("GATEWAY_HTTP_ADDR", "http://localhost:8080"),
            endpoint_secret,
            processor,
            registry: RegistryConfig::from_env()?,
            broker: BrokerConfig::from_env()?,
        })
    }
}
