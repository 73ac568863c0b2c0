//! RPC channel: resolve a peer through the registry and call it over HTTP/JSON

use http::HeaderMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::discovery::Registry;
use crate::error::{ApiResponse, AppError, AppResult};
use crate::telemetry::inject_http_headers;

/// Per-call deadline applied by every channel
pub const RPC_TIMEOUT: Duration = Duration::from_secs(10);

/// A channel to one resolved instance of a service
///
/// Plain `http://` (internal network). Build typed clients on top of it and
/// keep them for the life of the owning component.
#[derive(Debug, Clone)]
pub struct RpcChannel {
    service: String,
    base_url: String,
    client: reqwest::Client,
}

/// Resolve `service_name` and open a channel to it
///
/// Every call performs a fresh resolve; nothing is pooled across calls.
pub async fn connect(service_name: &str, registry: &dyn Registry) -> AppResult<RpcChannel> {
    let address = registry.resolve(service_name).await?;
    tracing::debug!(service = %service_name, address = %address, "rpc channel resolved");
    RpcChannel::new(service_name, &address)
}

impl RpcChannel {
    /// Channel to a known `host:port`
    pub fn new(service_name: &str, address: &str) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(RPC_TIMEOUT)
            .build()
            .map_err(|e| AppError::rpc_connect(format!("failed to build rpc client: {e}")))?;
        Ok(Self {
            service: service_name.to_string(),
            base_url: format!("http://{address}"),
            client,
        })
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Call `method` and decode its payload
    pub async fn call<Req, Resp>(&self, method: &str, request: &Req) -> AppResult<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        self.send(method, request)
            .await?
            .ok_or_else(|| AppError::internal(format!("empty response from {method}")))
    }

    /// Call `method`, ignoring any payload
    pub async fn call_empty<Req>(&self, method: &str, request: &Req) -> AppResult<()>
    where
        Req: Serialize + ?Sized,
    {
        self.send::<Req, serde_json::Value>(method, request)
            .await
            .map(|_| ())
    }

    async fn send<Req, Resp>(&self, method: &str, request: &Req) -> AppResult<Option<Resp>>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let mut headers = HeaderMap::new();
        inject_http_headers(&mut headers);

        let response = self
            .client
            .post(format!("{}{}", self.base_url, super::rpc_path(method)))
            .headers(headers)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(service = %self.service, method = %method, error = %e, "rpc call failed");
                AppError::rpc_connect(format!("failed to reach {}: {e}", self.service))
            })?;

        let status = response.status();
        let envelope: ApiResponse<Resp> = response.json().await.map_err(|e| {
            AppError::internal(format!("invalid response from {method} ({status}): {e}"))
        })?;
        envelope.into_result()
    }
}
