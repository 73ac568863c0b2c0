//! `OrderCreated` consumer: issue a checkout link for each new order

use async_trait::async_trait;
use std::sync::Arc;

use shared::broker::{Delivery, EventProcessor, ProcessResult};
use shared::models::Order;

use crate::service::PaymentService;

pub struct OrderCreatedProcessor {
    service: Arc<dyn PaymentService>,
}

impl OrderCreatedProcessor {
    pub fn new(service: Arc<dyn PaymentService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl EventProcessor for OrderCreatedProcessor {
    fn name(&self) -> &'static str {
        "order_created"
    }

    async fn process(&self, delivery: &Delivery) -> ProcessResult {
        let order: Order = match delivery.decode() {
            Ok(order) => order,
            Err(e) => {
                return ProcessResult::Failed {
                    reason: format!("failed to decode order: {e}"),
                };
            }
        };

        match self.service.create_payment(&order).await {
            Ok(link) => ProcessResult::Success {
                message: format!("payment link created for order {}: {link}", order.id),
            },
            Err(e) => ProcessResult::Retry {
                reason: format!("failed to create payment for order {}: {e}", order.id),
            },
        }
    }
}
