//! Outbound calls to the order service

use async_trait::async_trait;
use std::sync::Arc;

use shared::discovery::Registry;
use shared::error::AppResult;
use shared::models::{OrderStatus, UpdateOrderRequest};
use shared::rpc::{self, ORDER_SERVICE, methods};

#[async_trait]
pub trait OrderGateway: Send + Sync {
    /// Attach the checkout link and move the order to `waiting_payment`
    async fn update_order_after_payment_link(&self, order_id: &str, link: &str) -> AppResult<()>;
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
    async fn update_order_after_payment_link(&self, order_id: &str, link: &str) -> AppResult<()> {
        let channel = rpc::connect(ORDER_SERVICE, self.registry.as_ref()).await?;
        channel
            .call_empty(
                methods::UPDATE_ORDER,
                &UpdateOrderRequest {
                    order_id: order_id.to_string(),
                    status: OrderStatus::WaitingPayment,
                    payment_link: link.to_string(),
                },
            )
            .await
    }
}
