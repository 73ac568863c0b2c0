//! Payment service: checkout links for new orders and the payment webhook

pub mod config;
pub mod consumer;
pub mod gateway;
pub mod middleware;
pub mod processor;
pub mod service;
pub mod webhook;

use std::sync::Arc;

use gateway::OrderGateway;
use middleware::{LoggingMiddleware, TelemetryMiddleware};
use processor::PaymentProcessor;
use service::{PaymentService, PaymentServiceImpl};

/// Compose the service behind its decorators
pub fn build_service(
    processor: Arc<dyn PaymentProcessor>,
    orders: Arc<dyn OrderGateway>,
) -> Arc<dyn PaymentService> {
    let service = PaymentServiceImpl::new(processor, orders);
    Arc::new(LoggingMiddleware::new(TelemetryMiddleware::new(service)))
}
