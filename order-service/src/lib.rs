//! Order service: validation, persistence and the `OrderCreated` event

pub mod config;
pub mod gateway;
pub mod handler;
pub mod middleware;
pub mod service;
pub mod store;

use std::sync::Arc;

use shared::broker::Broker;

use gateway::StockGateway;
use middleware::{LoggingMiddleware, TelemetryMiddleware};
use service::{OrderService, OrderServiceImpl};
use store::OrderStore;

/// Compose the service behind its decorators
pub fn build_service(
    store: Arc<dyn OrderStore>,
    stock: Arc<dyn StockGateway>,
    broker: Arc<dyn Broker>,
) -> Arc<dyn OrderService> {
    let service = OrderServiceImpl::new(store, stock, broker);
    Arc::new(LoggingMiddleware::new(TelemetryMiddleware::new(service)))
}
