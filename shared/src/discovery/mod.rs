//! Service registry client
//!
//! A process registers itself under a logical service name, keeps the
//! registration alive with periodic health checks, and resolves peers by name.

mod consul;
mod memory;

pub use consul::ConsulRegistry;
pub use memory::MemoryRegistry;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::{RegistryConfig, RegistryKind};
use crate::error::AppResult;

/// Time-to-live of a registration without a passing health check
pub const HEALTH_TTL: Duration = Duration::from_secs(5);

#[async_trait]
pub trait Registry: Send + Sync {
    /// Register an instance. Registering the same id again replaces it.
    async fn register(&self, instance_id: &str, service_name: &str, address: &str)
    -> AppResult<()>;

    /// Best-effort removal on shutdown
    async fn deregister(&self, instance_id: &str, service_name: &str) -> AppResult<()>;

    /// Mark the instance alive for another TTL window
    async fn health_check(&self, instance_id: &str, service_name: &str) -> AppResult<()>;

    /// Address (`host:port`) of any healthy instance
    async fn resolve(&self, service_name: &str) -> AppResult<String>;
}

/// Unique id for one running instance of `service_name`
pub fn generate_instance_id(service_name: &str) -> String {
    format!("{}-{}", service_name, uuid::Uuid::new_v4())
}

/// Build the configured registry backend
pub fn from_config(config: &RegistryConfig) -> AppResult<Arc<dyn Registry>> {
    Ok(match config.kind {
        RegistryKind::Memory => Arc::new(MemoryRegistry::new()),
        RegistryKind::Consul => Arc::new(ConsulRegistry::new(&config.address)?),
    })
}

/// Periodic health-check loop. Failures are logged and retried next tick.
pub async fn run_health_checks(
    registry: Arc<dyn Registry>,
    instance_id: String,
    service_name: String,
    interval: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::debug!(service = %service_name, "health check loop stopped");
                break;
            }
            _ = ticker.tick() => {
                if let Err(e) = registry.health_check(&instance_id, &service_name).await {
                    tracing::error!(
                        service = %service_name,
                        instance_id = %instance_id,
                        error = %e,
                        "failed to health check"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_instance_id() {
        let a = generate_instance_id("orders");
        let b = generate_instance_id("orders");
        assert!(a.starts_with("orders-"));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_health_check_loop_keeps_instance_alive() {
        let registry = Arc::new(MemoryRegistry::with_ttl(Duration::from_millis(80)));
        registry
            .register("orders-1", "orders", "127.0.0.1:8001")
            .await
            .unwrap();

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(run_health_checks(
            registry.clone(),
            "orders-1".into(),
            "orders".into(),
            Duration::from_millis(20),
            shutdown.clone(),
        ));

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(registry.resolve("orders").await.unwrap(), "127.0.0.1:8001");

        shutdown.cancel();
        handle.await.unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(registry.resolve("orders").await.is_err());
    }
}
