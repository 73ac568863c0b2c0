//! Processor-side product catalog
//!
//! Each stock item mirrors a product and a price at the payment processor;
//! checkout sessions reference the price id.

mod memory;
mod stripe;

pub use memory::MemoryStockProcessor;
pub use stripe::StripeStockProcessor;

use async_trait::async_trait;
use std::collections::HashMap;

use shared::error::AppResult;

/// Product to mirror at the processor
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub currency: String,
    pub metadata: HashMap<String, String>,
}

/// Processor references of a created product
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRef {
    pub product_id: String,
    pub price_id: String,
}

/// Partial product update. A price replaces the current one.
#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub metadata: Option<HashMap<String, String>>,
    pub price: Option<f64>,
    pub currency: Option<String>,
}

#[async_trait]
pub trait StockProcessor: Send + Sync {
    async fn create_product(&self, product: &NewProduct) -> AppResult<ProductRef>;

    /// Returns the new price id when the price was replaced
    async fn update_product(
        &self,
        product_id: &str,
        price_id: &str,
        update: &ProductUpdate,
    ) -> AppResult<Option<String>>;

    async fn deactivate_product(&self, product_id: &str) -> AppResult<()>;
}

/// Prices are sent in minor units
pub fn to_minor_units(price: f64) -> i64 {
    (price * 100.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_minor_units() {
        assert_eq!(to_minor_units(999.0), 99900);
        assert_eq!(to_minor_units(19.99), 1999);
        assert_eq!(to_minor_units(0.1), 10);
    }
}
