//! Decorators around [`PaymentService`]

use async_trait::async_trait;
use std::time::Instant;
use tracing::Instrument;

use shared::error::AppResult;
use shared::models::Order;
use shared::telemetry::log_call;

use crate::service::PaymentService;

pub struct TelemetryMiddleware<S> {
    inner: S,
}

impl<S> TelemetryMiddleware<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S: PaymentService> PaymentService for TelemetryMiddleware<S> {
    async fn create_payment(&self, order: &Order) -> AppResult<String> {
        let span = tracing::info_span!(
            "CreatePayment",
            order_id = %order.id,
            customer_id = %order.customer_id,
            link = tracing::field::Empty,
        );
        let result = self
            .inner
            .create_payment(order)
            .instrument(span.clone())
            .await;
        if let Ok(link) = &result {
            span.record("link", link.as_str());
        }
        result
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
impl<S: PaymentService> PaymentService for LoggingMiddleware<S> {
    async fn create_payment(&self, order: &Order) -> AppResult<String> {
        let started = Instant::now();
        let result = self.inner.create_payment(order).await;
        log_call("CreatePayment", started, &result);
        result
    }
}
