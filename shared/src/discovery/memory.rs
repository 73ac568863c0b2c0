//! In-process registry with TTL health semantics

use async_trait::async_trait;
use dashmap::DashMap;
use rand::Rng;
use std::time::{Duration, Instant};

use super::{HEALTH_TTL, Registry};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone)]
struct Instance {
    id: String,
    address: String,
    last_pass: Instant,
}

/// Registry kept in a concurrent map, keyed by service name
#[derive(Debug)]
pub struct MemoryRegistry {
    services: DashMap<String, Vec<Instance>>,
    ttl: Duration,
}

impl Default for MemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::with_ttl(HEALTH_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            services: DashMap::new(),
            ttl,
        }
    }
}

#[async_trait]
impl Registry for MemoryRegistry {
    async fn register(
        &self,
        instance_id: &str,
        service_name: &str,
        address: &str,
    ) -> AppResult<()> {
        let mut instances = self.services.entry(service_name.to_string()).or_default();
        instances.retain(|i| i.id != instance_id);
        instances.push(Instance {
            id: instance_id.to_string(),
            address: address.to_string(),
            last_pass: Instant::now(),
        });
        tracing::info!(service = %service_name, instance_id = %instance_id, address = %address, "instance registered");
        Ok(())
    }

    async fn deregister(&self, instance_id: &str, service_name: &str) -> AppResult<()> {
        if let Some(mut instances) = self.services.get_mut(service_name) {
            instances.retain(|i| i.id != instance_id);
        }
        tracing::info!(service = %service_name, instance_id = %instance_id, "instance deregistered");
        Ok(())
    }

    async fn health_check(&self, instance_id: &str, service_name: &str) -> AppResult<()> {
        let mut instances = self
            .services
            .get_mut(service_name)
            .ok_or_else(|| AppError::service_unavailable(service_name))?;
        let instance = instances
            .iter_mut()
            .find(|i| i.id == instance_id)
            .ok_or_else(|| AppError::not_found(format!("Instance {instance_id}")))?;
        instance.last_pass = Instant::now();
        Ok(())
    }

    async fn resolve(&self, service_name: &str) -> AppResult<String> {
        let healthy: Vec<String> = self
            .services
            .get(service_name)
            .map(|instances| {
                instances
                    .iter()
                    .filter(|i| i.last_pass.elapsed() <= self.ttl)
                    .map(|i| i.address.clone())
                    .collect()
            })
            .unwrap_or_default();

        if healthy.is_empty() {
            return Err(AppError::service_unavailable(service_name));
        }
        let index = rand::thread_rng().gen_range(0..healthy.len());
        Ok(healthy[index].clone())
    }
}
