//! Catalog persistence
//!
//! Every change to `quantity` goes through one conditional primitive that
//! checks and writes under the row's lock, so concurrent deductions cannot
//! oversell.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::collections::HashMap;

use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{CreateItemRequest, StockItem};

/// Fields an item update may overwrite
#[derive(Debug, Clone, Default)]
pub struct ItemPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub price_id: Option<String>,
    pub metadata: Option<HashMap<String, String>>,
}

#[async_trait]
pub trait StockStore: Send + Sync {
    async fn create(
        &self,
        product_id: &str,
        price_id: &str,
        request: &CreateItemRequest,
    ) -> AppResult<StockItem>;

    async fn get(&self, id: &str) -> AppResult<StockItem>;

    /// Active items only
    async fn list(&self) -> AppResult<Vec<StockItem>>;

    /// Active items among `ids`; unknown ids are skipped
    async fn get_many(&self, ids: &[String]) -> AppResult<Vec<StockItem>>;

    async fn update_item(&self, id: &str, patch: ItemPatch) -> AppResult<StockItem>;

    /// Absolute set of the available count
    async fn update_stock(&self, id: &str, quantity: i64) -> AppResult<StockItem>;

    /// Decrement only where `quantity >= requested`
    async fn deduct_stock(&self, id: &str, quantity: i64) -> AppResult<StockItem>;

    /// Soft delete (`active = false`)
    async fn deactivate(&self, id: &str) -> AppResult<()>;
}

#[derive(Default)]
pub struct MemoryStockStore {
    items: DashMap<String, StockItem>,
}

impl MemoryStockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `next` to the stored quantity while holding the row lock.
    /// `None` from `next` leaves the row untouched.
    fn modify_quantity(
        &self,
        id: &str,
        next: impl FnOnce(i64) -> Option<i64>,
    ) -> Option<StockItem> {
        let mut item = self.items.get_mut(id)?;
        let quantity = next(item.quantity).filter(|q| *q >= 0)?;
        item.quantity = quantity;
        item.updated_at = Utc::now();
        Some(item.clone())
    }
}

#[async_trait]
impl StockStore for MemoryStockStore {
    async fn create(
        &self,
        product_id: &str,
        price_id: &str,
        request: &CreateItemRequest,
    ) -> AppResult<StockItem> {
        let now = Utc::now();
        let item = StockItem {
            id: uuid::Uuid::new_v4().to_string(),
            product_id: product_id.to_string(),
            name: request.name.clone(),
            description: request.description.clone(),
            price: request.price,
            currency: request.currency.clone(),
            price_id: price_id.to_string(),
            quantity: request.quantity,
            active: true,
            metadata: request.metadata.clone(),
            created_at: now,
            updated_at: now,
        };
        self.items.insert(item.id.clone(), item.clone());
        Ok(item)
    }

    async fn get(&self, id: &str) -> AppResult<StockItem> {
        self.items
            .get(id)
            .map(|item| item.clone())
            .ok_or_else(|| AppError::item_not_found(id))
    }

    async fn list(&self) -> AppResult<Vec<StockItem>> {
        let mut items: Vec<StockItem> = self
            .items
            .iter()
            .filter(|entry| entry.active)
            .map(|entry| entry.value().clone())
            .collect();
        items.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(items)
    }

    async fn get_many(&self, ids: &[String]) -> AppResult<Vec<StockItem>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.items.get(id))
            .filter(|item| item.active)
            .map(|item| item.clone())
            .collect())
    }

    async fn update_item(&self, id: &str, patch: ItemPatch) -> AppResult<StockItem> {
        let mut item = self
            .items
            .get_mut(id)
            .ok_or_else(|| AppError::item_not_found(id))?;
        if let Some(name) = patch.name {
            item.name = name;
        }
        if let Some(description) = patch.description {
            item.description = description;
        }
        if let Some(price) = patch.price {
            item.price = price;
        }
        if let Some(currency) = patch.currency {
            item.currency = currency;
        }
        if let Some(price_id) = patch.price_id {
            item.price_id = price_id;
        }
        if let Some(metadata) = patch.metadata {
            item.metadata = metadata;
        }
        item.updated_at = Utc::now();
        Ok(item.clone())
    }

    async fn update_stock(&self, id: &str, quantity: i64) -> AppResult<StockItem> {
        if quantity < 0 {
            return Err(AppError::with_message(
                ErrorCode::InvalidStockQuantity,
                "Quantity must not be negative",
            ));
        }
        self.modify_quantity(id, |_| Some(quantity))
            .ok_or_else(|| AppError::item_not_found(id))
    }

    async fn deduct_stock(&self, id: &str, quantity: i64) -> AppResult<StockItem> {
        if quantity <= 0 {
            return Err(AppError::new(ErrorCode::InvalidStockQuantity).with_detail("item_id", id));
        }
        self.modify_quantity(id, |stored| stored.checked_sub(quantity))
            .ok_or_else(|| {
                AppError::new(ErrorCode::StockDeductionFailed)
                    .with_detail("item_id", id)
                    .with_detail("requested", quantity)
            })
    }

    async fn deactivate(&self, id: &str) -> AppResult<()> {
        let mut item = self
            .items
            .get_mut(id)
            .ok_or_else(|| AppError::item_not_found(id))?;
        item.active = false;
        item.updated_at = Utc::now();
        Ok(())
    }
}
