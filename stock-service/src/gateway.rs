//! Outbound calls to the order service

use async_trait::async_trait;
use std::sync::Arc;

use shared::discovery::Registry;
use shared::error::AppResult;
use shared::models::{GetOrderRequest, Item, Order};
use shared::rpc::{self, ORDER_SERVICE, methods};

#[async_trait]
pub trait OrderGateway: Send + Sync {
    /// Item lines of a persisted order
    async fn get_order_items(&self, order_id: &str, customer_id: &str) -> AppResult<Vec<Item>>;
}

pub struct RpcOrderGateway {
    registry: Arc<dyn Registry>,
}

impl RpcOrderGateway {
    pub fn new(registry: Arc<dyn Registry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl OrderGateway for RpcOrderGateway {
    async fn get_order_items(&self, order_id: &str, customer_id: &str) -> AppResult<Vec<Item>> {
        let channel = rpc::connect(ORDER_SERVICE, self.registry.as_ref()).await?;
        let order: Order = channel
            .call(
                methods::GET_ORDER_FOR_STOCK_UPDATE,
                &GetOrderRequest {
                    order_id: order_id.to_string(),
                    customer_id: customer_id.to_string(),
                },
            )
            .await?;
        Ok(order.items)
    }
}
