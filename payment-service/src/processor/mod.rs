//! Payment processors issuing checkout links

mod memory;
mod stripe;

pub use memory::{DUMMY_LINK, MemoryPaymentProcessor};
pub use stripe::StripePaymentProcessor;

use async_trait::async_trait;

use shared::error::AppResult;
use shared::models::Order;

#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Hosted checkout link for every line of `order`
    ///
    /// The processor keeps `orderID` and `customerID` as metadata so the
    /// completion webhook can be correlated without a lookup.
    async fn create_payment_link(&self, order: &Order) -> AppResult<String>;
}

/// Where the customer lands after a successful checkout
pub fn success_url(gateway_addr: &str, order: &Order) -> String {
    order.success_url(gateway_addr)
}

pub fn cancel_url(gateway_addr: &str) -> String {
    format!("{gateway_addr}/cancel.html")
}
