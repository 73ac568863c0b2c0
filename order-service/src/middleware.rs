//! Decorators around [`OrderService`]
//!
//! `LoggingMiddleware(TelemetryMiddleware(OrderServiceImpl))`: handlers only
//! ever see the outermost layer.

use async_trait::async_trait;
use std::time::Instant;
use tracing::Instrument;

use shared::error::AppResult;
use shared::models::{CreateOrderRequest, Order, OrderStatus};
use shared::telemetry::log_call;

use crate::service::OrderService;

/// Opens one span per call, annotated with the call's key arguments
pub struct TelemetryMiddleware<S> {
    inner: S,
}

impl<S> TelemetryMiddleware<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S: OrderService> OrderService for TelemetryMiddleware<S> {
    async fn create_order(&self, request: CreateOrderRequest) -> AppResult<Order> {
        let span = tracing::info_span!(
            "CreateOrder",
            customer_id = %request.customer_id,
            lines = request.items.len(),
        );
        self.inner.create_order(request).instrument(span).await
    }

    async fn get_order(&self, order_id: &str, customer_id: &str) -> AppResult<Order> {
        let span = tracing::info_span!("GetOrder", order_id, customer_id);
        self.inner
            .get_order(order_id, customer_id)
            .instrument(span)
            .await
    }

    async fn update_order(
        &self,
        order_id: &str,
        status: OrderStatus,
        payment_link: &str,
    ) -> AppResult<Order> {
        let span = tracing::info_span!("UpdateOrder", order_id, status = %status);
        self.inner
            .update_order(order_id, status, payment_link)
            .instrument(span)
            .await
    }

    async fn get_order_for_stock_update(
        &self,
        order_id: &str,
        customer_id: &str,
    ) -> AppResult<Order> {
        let span = tracing::info_span!("GetOrderForStockUpdate", order_id, customer_id);
        self.inner
            .get_order_for_stock_update(order_id, customer_id)
            .instrument(span)
            .await
    }
}

/// Times each call and logs its outcome
pub struct LoggingMiddleware<S> {
    inner: S,
}

impl<S> LoggingMiddleware<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S: OrderService> OrderService for LoggingMiddleware<S> {
    async fn create_order(&self, request: CreateOrderRequest) -> AppResult<Order> {
        let started = Instant::now();
        let result = self.inner.create_order(request).await;
        log_call("CreateOrder", started, &result);
        result
    }

    async fn get_order(&self, order_id: &str, customer_id: &str) -> AppResult<Order> {
        let started = Instant::now();
        let result = self.inner.get_order(order_id, customer_id).await;
        log_call("GetOrder", started, &result);
        result
    }

    async fn update_order(
        &self,
        order_id: &str,
        status: OrderStatus,
        payment_link: &str,
    ) -> AppResult<Order> {
        let started = Instant::now();
        let result = self
            .inner
            .update_order(order_id, status, payment_link)
            .await;
        log_call("UpdateOrder", started, &result);
        result
    }

    async fn get_order_for_stock_update(
        &self,
        order_id: &str,
        customer_id: &str,
    ) -> AppResult<Order> {
        let started = Instant::now();
        let result = self
            .inner
            .get_order_for_stock_update(order_id, customer_id)
            .await;
        log_call("GetOrderForStockUpdate", started, &result);
        result
    }
}
