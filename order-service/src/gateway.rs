//! Outbound calls to the stock service

use async_trait::async_trait;
use std::sync::Arc;

use shared::discovery::Registry;
use shared::error::AppResult;
use shared::models::{CheckStockRequest, CheckStockResponse, ItemWithQuantity};
use shared::rpc::{self, STOCK_SERVICE, methods};

#[async_trait]
pub trait StockGateway: Send + Sync {
    async fn check_if_items_in_stock(
        &self,
        items: &[ItemWithQuantity],
    ) -> AppResult<CheckStockResponse>;
}

/// Resolves the stock service on every call, so a restarted peer on a new
/// address is picked up without restarting this process.
pub struct RpcStockGateway {
    registry: Arc<dyn Registry>,
}

impl RpcStockGateway {
    pub fn new(registry: Arc<dyn Registry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl StockGateway for RpcStockGateway {
    async fn check_if_items_in_stock(
        &self,
        items: &[ItemWithQuantity],
    ) -> AppResult<CheckStockResponse> {
        let channel = rpc::connect(STOCK_SERVICE, self.registry.as_ref()).await?;
        channel
            .call(
                methods::CHECK_IF_ITEMS_IN_STOCK,
                &CheckStockRequest {
                    items: items.to_vec(),
                },
            )
            .await
    }
}
