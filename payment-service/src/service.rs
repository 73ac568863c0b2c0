//! Payment Service
//!
//! Turns a freshly created order into a checkout link and records the link
//! on the order.

use async_trait::async_trait;
use std::sync::Arc;

use shared::error::AppResult;
use shared::models::Order;

use crate::gateway::OrderGateway;
use crate::processor::PaymentProcessor;

#[async_trait]
pub trait PaymentService: Send + Sync {
    /// Returns the checkout link
    async fn create_payment(&self, order: &Order) -> AppResult<String>;
}

pub struct PaymentServiceImpl {
    processor: Arc<dyn PaymentProcessor>,
    orders: Arc<dyn OrderGateway>,
}

impl PaymentServiceImpl {
    pub fn new(processor: Arc<dyn PaymentProcessor>, orders: Arc<dyn OrderGateway>) -> Self {
        Self { processor, orders }
    }
}

#[async_trait]
impl PaymentService for PaymentServiceImpl {
    async fn create_payment(&self, order: &Order) -> AppResult<String> {
        let link = self.processor.create_payment_link(order).await?;
        self.orders
            .update_order_after_payment_link(&order.id, &link)
            .await?;
        Ok(link)
    }
}
