use async_trait::async_trait;

use shared::error::AppResult;
use shared::models::Order;

use super::PaymentProcessor;

pub const DUMMY_LINK: &str = "dummy-link";

/// Processor stand-in that always issues the same link
#[derive(Debug, Default)]
pub struct MemoryPaymentProcessor;

impl MemoryPaymentProcessor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PaymentProcessor for MemoryPaymentProcessor {
    async fn create_payment_link(&self, _order: &Order) -> AppResult<String> {
        Ok(DUMMY_LINK.to_string())
    }
}
