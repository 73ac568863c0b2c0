use async_trait::async_trait;
use dashmap::DashMap;

use shared::error::{AppError, AppResult};

use super::{NewProduct, ProductRef, ProductUpdate, StockProcessor};

#[derive(Debug, Clone)]
pub struct MemoryProduct {
    pub name: String,
    pub price_id: String,
    pub active: bool,
}

/// Processor stand-in that keeps products in memory
#[derive(Default)]
pub struct MemoryStockProcessor {
    products: DashMap<String, MemoryProduct>,
}

impl MemoryStockProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn product(&self, product_id: &str) -> Option<MemoryProduct> {
        self.products.get(product_id).map(|p| p.clone())
    }
}

fn new_id(prefix: &str) -> String {
    format!("{}_{}", prefix, uuid::Uuid::new_v4().simple())
}

#[async_trait]
impl StockProcessor for MemoryStockProcessor {
    async fn create_product(&self, product: &NewProduct) -> AppResult<ProductRef> {
        let refs = ProductRef {
            product_id: new_id("prod"),
            price_id: new_id("price"),
        };
        self.products.insert(
            refs.product_id.clone(),
            MemoryProduct {
                name: product.name.clone(),
                price_id: refs.price_id.clone(),
                active: true,
            },
        );
        Ok(refs)
    }

    async fn update_product(
        &self,
        product_id: &str,
        _price_id: &str,
        update: &ProductUpdate,
    ) -> AppResult<Option<String>> {
        let mut product = self
            .products
            .get_mut(product_id)
            .ok_or_else(|| AppError::processor(format!("no such product: {product_id}")))?;
        product.active = true;
        if let Some(name) = update.name.as_ref().filter(|s| !s.is_empty()) {
            product.name = name.clone();
        }
        if update.price.is_some_and(|p| p > 0.0) {
            product.price_id = new_id("price");
            return Ok(Some(product.price_id.clone()));
        }
        Ok(None)
    }

    async fn deactivate_product(&self, product_id: &str) -> AppResult<()> {
        let mut product = self
            .products
            .get_mut(product_id)
            .ok_or_else(|| AppError::processor(format!("no such product: {product_id}")))?;
        product.active = false;
        Ok(())
    }
}
