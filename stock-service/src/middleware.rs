//! Decorators around [`StockService`]

use async_trait::async_trait;
use std::time::Instant;
use tracing::Instrument;

use shared::error::AppResult;
use shared::models::{
    CheckStockResponse, CreateItemRequest, Item, ItemWithQuantity, Order, StockItem,
    UpdateItemRequest,
};
use shared::telemetry::log_call;

use crate::service::StockService;

pub struct TelemetryMiddleware<S> {
    inner: S,
}

impl<S> TelemetryMiddleware<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S: StockService> StockService for TelemetryMiddleware<S> {
    async fn check_if_items_in_stock(
        &self,
        items: &[ItemWithQuantity],
    ) -> AppResult<CheckStockResponse> {
        let span = tracing::info_span!("CheckIfItemsInStock", lines = items.len());
        self.inner
            .check_if_items_in_stock(items)
            .instrument(span)
            .await
    }

    async fn get_items(&self) -> AppResult<Vec<StockItem>> {
        let span = tracing::info_span!("GetItems");
        self.inner.get_items().instrument(span).await
    }

    async fn get_item(&self, id: &str) -> AppResult<StockItem> {
        let span = tracing::info_span!("GetItem", item_id = id);
        self.inner.get_item(id).instrument(span).await
    }

    async fn create_item(&self, request: CreateItemRequest) -> AppResult<String> {
        let span = tracing::info_span!(
            "CreateItem",
            name = %request.name,
            quantity = request.quantity,
        );
        self.inner.create_item(request).instrument(span).await
    }

    async fn update_item(&self, id: &str, request: UpdateItemRequest) -> AppResult<StockItem> {
        let span = tracing::info_span!("UpdateItem", item_id = id);
        self.inner.update_item(id, request).instrument(span).await
    }

    async fn update_stock(&self, id: &str, quantity: i64) -> AppResult<StockItem> {
        let span = tracing::info_span!("UpdateStock", item_id = id, quantity);
        self.inner.update_stock(id, quantity).instrument(span).await
    }

    async fn delete_item(&self, id: &str) -> AppResult<()> {
        let span = tracing::info_span!("DeleteItem", item_id = id);
        self.inner.delete_item(id).instrument(span).await
    }

    async fn deduct_stock(&self, id: &str, quantity: i64) -> AppResult<StockItem> {
        let span = tracing::info_span!("DeductStock", item_id = id, quantity);
        self.inner.deduct_stock(id, quantity).instrument(span).await
    }

    async fn get_order_items(&self, order: &Order) -> AppResult<Vec<Item>> {
        let span = tracing::info_span!("GetOrderItems", order_id = %order.id);
        self.inner.get_order_items(order).instrument(span).await
    }
}

pub struct LoggingMiddleware<S> {
    inner: S,
}

impl<S> LoggingMiddleware<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S: StockService> StockService for LoggingMiddleware<S> {
    async fn check_if_items_in_stock(
        &self,
        items: &[ItemWithQuantity],
    ) -> AppResult<CheckStockResponse> {
        let started = Instant::now();
        let result = self.inner.check_if_items_in_stock(items).await;
        log_call("CheckIfItemsInStock", started, &result);
        result
    }

    async fn get_items(&self) -> AppResult<Vec<StockItem>> {
        let started = Instant::now();
        let result = self.inner.get_items().await;
        log_call("GetItems", started, &result);
        result
    }

    async fn get_item(&self, id: &str) -> AppResult<StockItem> {
        let started = Instant::now();
        let result = self.inner.get_item(id).await;
        log_call("GetItem", started, &result);
        result
    }

    async fn create_item(&self, request: CreateItemRequest) -> AppResult<String> {
        let started = Instant::now();
        let result = self.inner.create_item(request).await;
        log_call("CreateItem", started, &result);
        result
    }

    async fn update_item(&self, id: &str, request: UpdateItemRequest) -> AppResult<StockItem> {
        let started = Instant::now();
        let result = self.inner.update_item(id, request).await;
        log_call("UpdateItem", started, &result);
        result
    }

    async fn update_stock(&self, id: &str, quantity: i64) -> AppResult<StockItem> {
        let started = Instant::now();
        let result = self.inner.update_stock(id, quantity).await;
        log_call("UpdateStock", started, &result);
        result
    }

    async fn delete_item(&self, id: &str) -> AppResult<()> {
        let started = Instant::now();
        let result = self.inner.delete_item(id).await;
        log_call("DeleteItem", started, &result);
        result
    }

    async fn deduct_stock(&self, id: &str, quantity: i64) -> AppResult<StockItem> {
        let started = Instant::now();
        let result = self.inner.deduct_stock(id, quantity).await;
        log_call("DeductStock", started, &result);
        result
    }

    async fn get_order_items(&self, order: &Order) -> AppResult<Vec<Item>> {
        let started = Instant::now();
        let result = self.inner.get_order_items(order).await;
        log_call("GetOrderItems", started, &result);
        result
    }
}
