//! Stock Service
//!
//! Answers availability checks for the order service, deducts inventory for
//! paid orders, and manages the catalog mirrored at the payment processor.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{
    CheckStockResponse, CreateItemRequest, Item, ItemWithQuantity, Order, StockItem,
    UpdateItemRequest,
};

use crate::gateway::OrderGateway;
use crate::processor::{NewProduct, ProductUpdate, StockProcessor};
use crate::store::{ItemPatch, StockStore};

#[async_trait]
pub trait StockService: Send + Sync {
    /// All-or-nothing availability check
    async fn check_if_items_in_stock(
        &self,
        items: &[ItemWithQuantity],
    ) -> AppResult<CheckStockResponse>;

    async fn get_items(&self) -> AppResult<Vec<StockItem>>;

    async fn get_item(&self, id: &str) -> AppResult<StockItem>;

    /// Returns the new item id
    async fn create_item(&self, request: CreateItemRequest) -> AppResult<String>;

    async fn update_item(&self, id: &str, request: UpdateItemRequest) -> AppResult<StockItem>;

    /// Absolute set of the available count
    async fn update_stock(&self, id: &str, quantity: i64) -> AppResult<StockItem>;

    async fn delete_item(&self, id: &str) -> AppResult<()>;

    async fn deduct_stock(&self, id: &str, quantity: i64) -> AppResult<StockItem>;

    /// Lines of a paid order, fetched from the order service
    async fn get_order_items(&self, order: &Order) -> AppResult<Vec<Item>>;
}

pub struct StockServiceImpl {
    store: Arc<dyn StockStore>,
    processor: Arc<dyn StockProcessor>,
    orders: Arc<dyn OrderGateway>,
}

impl StockServiceImpl {
    pub fn new(
        store: Arc<dyn StockStore>,
        processor: Arc<dyn StockProcessor>,
        orders: Arc<dyn OrderGateway>,
    ) -> Self {
        Self {
            store,
            processor,
            orders,
        }
    }
}

#[async_trait]
impl StockService for StockServiceImpl {
    async fn check_if_items_in_stock(
        &self,
        items: &[ItemWithQuantity],
    ) -> AppResult<CheckStockResponse> {
        if let Some(line) = items.iter().find(|line| line.quantity <= 0) {
            return Err(AppError::new(ErrorCode::InvalidStockQuantity)
                .with_detail("item_id", line.id.clone())
                .with_detail("quantity", line.quantity));
        }
        let ids: Vec<String> = items.iter().map(|i| i.id.clone()).collect();
        let stored = self.store.get_many(&ids).await?;
        if stored.is_empty() {
            return Ok(CheckStockResponse {
                in_stock: false,
                items: Vec::new(),
            });
        }

        let by_id: HashMap<&str, &StockItem> =
            stored.iter().map(|item| (item.id.as_str(), item)).collect();

        let mut available = Vec::with_capacity(items.len());
        for line in items {
            // Unknown or deactivated items count as zero stock
            let Some(item) = by_id
                .get(line.id.as_str())
                .filter(|item| item.quantity >= i64::from(line.quantity))
            else {
                return Ok(CheckStockResponse {
                    in_stock: false,
                    items: Vec::new(),
                });
            };
            available.push(Item {
                id: item.id.clone(),
                name: item.name.clone(),
                quantity: line.quantity,
                price_id: item.price_id.clone(),
            });
        }

        Ok(CheckStockResponse {
            in_stock: true,
            items: available,
        })
    }

    async fn get_items(&self) -> AppResult<Vec<StockItem>> {
        let items = self.store.list().await?;
        if items.is_empty() {
            return Err(AppError::new(ErrorCode::CatalogEmpty));
        }
        Ok(items)
    }

    async fn get_item(&self, id: &str) -> AppResult<StockItem> {
        self.store.get(id).await
    }

    async fn create_item(&self, request: CreateItemRequest) -> AppResult<String> {
        if request.quantity <= 0 {
            return Err(AppError::new(ErrorCode::InvalidStockQuantity));
        }
        if request.name.is_empty() {
            return Err(AppError::with_message(
                ErrorCode::RequiredField,
                "name is required",
            ));
        }

        let refs = self
            .processor
            .create_product(&NewProduct {
                name: request.name.clone(),
                description: request.description.clone(),
                price: request.price,
                currency: request.currency.clone(),
                metadata: request.metadata.clone(),
            })
            .await?;

        let item = self
            .store
            .create(&refs.product_id, &refs.price_id, &request)
            .await?;
        Ok(item.id)
    }

    async fn update_item(&self, id: &str, request: UpdateItemRequest) -> AppResult<StockItem> {
        let current = self.store.get(id).await?;
        let price_changed = request.price.is_some_and(|p| p > 0.0 && p != current.price);

        let update = ProductUpdate {
            name: request.name.clone(),
            description: request.description.clone(),
            metadata: request.metadata.clone(),
            price: request.price.filter(|_| price_changed),
            currency: Some(
                request
                    .currency
                    .clone()
                    .unwrap_or_else(|| current.currency.clone()),
            ),
        };
        let new_price_id = self
            .processor
            .update_product(&current.product_id, &current.price_id, &update)
            .await?;

        self.store
            .update_item(
                id,
                ItemPatch {
                    name: request.name,
                    description: request.description,
                    price: request.price.filter(|p| *p > 0.0),
                    currency: request.currency,
                    price_id: new_price_id,
                    metadata: request.metadata,
                },
            )
            .await
    }

    async fn update_stock(&self, id: &str, quantity: i64) -> AppResult<StockItem> {
        self.store.update_stock(id, quantity).await
    }

    async fn delete_item(&self, id: &str) -> AppResult<()> {
        let current = self.store.get(id).await?;
        self.processor
            .deactivate_product(&current.product_id)
            .await?;
        self.store.deactivate(id).await
    }

    async fn deduct_stock(&self, id: &str, quantity: i64) -> AppResult<StockItem> {
        self.store.deduct_stock(id, quantity).await
    }

    async fn get_order_items(&self, order: &Order) -> AppResult<Vec<Item>> {
        self.orders
            .get_order_items(&order.id, &order.customer_id)
            .await
    }
}
