//! `OrderPaid` consumer: deduct inventory for every line of a paid order

use async_trait::async_trait;
use dashmap::DashSet;
use std::sync::Arc;

use shared::broker::{Delivery, EventProcessor, MAX_RETRY_COUNT, ProcessResult};
use shared::models::{Order, OrderStatus};

use crate::service::StockService;

pub struct OrderPaidProcessor {
    service: Arc<dyn StockService>,
    /// `(order id, item id)` lines already deducted by an earlier attempt of
    /// a message that is being retried
    deducted: DashSet<(String, String)>,
}

impl OrderPaidProcessor {
    pub fn new(service: Arc<dyn StockService>) -> Self {
        Self {
            service,
            deducted: DashSet::new(),
        }
    }

    /// Lines of in-flight orders that were deducted but not yet completed
    pub fn pending_lines(&self) -> usize {
        self.deducted.len()
    }

    fn forget(&self, order_id: &str) {
        self.deducted.retain(|(id, _)| id != order_id);
    }
}

#[async_trait]
impl EventProcessor for OrderPaidProcessor {
    fn name(&self) -> &'static str {
        "order_paid"
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
        if order.status != OrderStatus::Paid {
            return ProcessResult::Skipped {
                reason: format!("order {} is {}, not paid", order.id, order.status),
            };
        }

        let items = match self.service.get_order_items(&order).await {
            Ok(items) => items,
            Err(e) if e.is_not_found() => {
                self.forget(&order.id);
                return ProcessResult::Failed {
                    reason: format!("order {} not found", order.id),
                };
            }
            Err(e) => {
                if delivery.retry_count() >= MAX_RETRY_COUNT {
                    self.forget(&order.id);
                }
                return ProcessResult::Retry {
                    reason: format!("failed to get order {}: {e}", order.id),
                };
            }
        };

        for item in &items {
            let key = (order.id.clone(), item.id.clone());
            if self.deducted.contains(&key) {
                continue;
            }
            if let Err(e) = self
                .service
                .deduct_stock(&item.id, i64::from(item.quantity))
                .await
            {
                // Last attempt: the message goes to the dead letter queue
                if delivery.retry_count() >= MAX_RETRY_COUNT {
                    self.forget(&order.id);
                }
                return ProcessResult::Retry {
                    reason: format!("failed to deduct stock for item {}: {e}", item.id),
                };
            }
            self.deducted.insert(key);
        }

        self.forget(&order.id);
        ProcessResult::Success {
            message: format!("stock deducted for order {}", order.id),
        }
    }
}
