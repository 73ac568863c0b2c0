//! Consul agent HTTP API client

use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{HEALTH_TTL, Registry};
use crate::error::{AppError, AppResult};

/// Registry backed by a Consul agent
#[derive(Debug, Clone)]
pub struct ConsulRegistry {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ServiceRegistration<'a> {
    #[serde(rename = "ID")]
    id: &'a str,
    name: &'a str,
    address: &'a str,
    port: u16,
    check: AgentCheck<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct AgentCheck<'a> {
    #[serde(rename = "CheckID")]
    check_id: &'a str,
    #[serde(rename = "TTL")]
    ttl: String,
    deregister_critical_service_after: &'static str,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HealthEntry {
    service: HealthService,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HealthService {
    address: String,
    port: u16,
}

impl ConsulRegistry {
    /// `address` is the agent's `host:port`
    pub fn new(address: &str) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| AppError::config(format!("failed to build consul client: {e}")))?;
        Ok(Self {
            base_url: format!("http://{}", address.trim_end_matches('/')),
            client,
        })
    }

    async fn put(&self, path: &str, body: Option<&ServiceRegistration<'_>>) -> AppResult<()> {
        let mut request = self.client.put(format!("{}{}", self.base_url, path));
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request
            .send()
            .await
            .map_err(|e| AppError::service_unavailable("consul").with_detail("error", e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::internal(format!(
                "consul {path} returned {status}: {text}"
            )));
        }
        Ok(())
    }
}

fn split_host_port(address: &str) -> AppResult<(&str, u16)> {
    let (host, port) = address
        .rsplit_once(':')
        .ok_or_else(|| AppError::config(format!("address must be host:port, got {address}")))?;
    let port = port
        .parse()
        .map_err(|_| AppError::config(format!("invalid port in {address}")))?;
    Ok((host, port))
}

#[async_trait]
impl Registry for ConsulRegistry {
    async fn register(
        &self,
        instance_id: &str,
        service_name: &str,
        address: &str,
    ) -> AppResult<()> {
        let (host, port) = split_host_port(address)?;
        let registration = ServiceRegistration {
            id: instance_id,
            name: service_name,
            address: host,
            port,
            check: AgentCheck {
                check_id: instance_id,
                ttl: format!("{}s", HEALTH_TTL.as_secs()),
                deregister_critical_service_after: "10s",
            },
        };
        self.put("/v1/agent/service/register", Some(&registration))
            .await?;
        tracing::info!(service = %service_name, instance_id = %instance_id, address = %address, "registered with consul");
        Ok(())
    }

    async fn deregister(&self, instance_id: &str, service_name: &str) -> AppResult<()> {
        self.put(&format!("/v1/agent/service/deregister/{instance_id}"), None)
            .await?;
        tracing::info!(service = %service_name, instance_id = %instance_id, "deregistered from consul");
        Ok(())
    }

    async fn health_check(&self, instance_id: &str, _service_name: &str) -> AppResult<()> {
        self.put(&format!("/v1/agent/check/pass/{instance_id}"), None)
            .await
    }

    async fn resolve(&self, service_name: &str) -> AppResult<String> {
        let entries: Vec<HealthEntry> = self
            .client
            .get(format!(
                "{}/v1/health/service/{}?passing=true",
                self.base_url, service_name
            ))
            .send()
            .await
            .map_err(|e| AppError::service_unavailable("consul").with_detail("error", e.to_string()))?
            .error_for_status()
            .map_err(|e| AppError::internal(format!("consul health query failed: {e}")))?
            .json()
            .await
            .map_err(|e| AppError::internal(format!("invalid consul response: {e}")))?;

        if entries.is_empty() {
            return Err(AppError::service_unavailable(service_name));
        }
        let index = rand::thread_rng().gen_range(0..entries.len());
        let service = &entries[index].service;
        Ok(format!("{}:{}", service.address, service.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_host_port() {
        assert_eq!(split_host_port("localhost:8001").unwrap(), ("localhost", 8001));
        assert!(split_host_port("localhost").is_err());
        assert!(split_host_port("localhost:http").is_err());
    }

    #[test]
    fn test_registration_body() {
        let registration = ServiceRegistration {
            id: "orders-1",
            name: "orders",
            address: "localhost",
            port: 8001,
            check: AgentCheck {
                check_id: "orders-1",
                ttl: "5s".into(),
                deregister_critical_service_after: "10s",
            },
        };
        let json = serde_json::to_value(&registration).unwrap();
        assert_eq!(json["ID"], "orders-1");
        assert_eq!(json["Name"], "orders");
        assert_eq!(json["Port"], 8001);
        assert_eq!(json["Check"]["CheckID"], "orders-1");
        assert_eq!(json["Check"]["TTL"], "5s");
        assert_eq!(json["Check"]["DeregisterCriticalServiceAfter"], "10s");
    }

    #[test]
    fn test_health_entry_decode() {
        let body = r#"[{"Node":{"Node":"n1"},"Service":{"ID":"stocks-1","Service":"stocks","Address":"10.0.0.7","Port":8002},"Checks":[]}]"#;
        let entries: Vec<HealthEntry> = serde_json::from_str(body).unwrap();
        assert_eq!(entries[0].service.address, "10.0.0.7");
        assert_eq!(entries[0].service.port, 8002);
    }
}
