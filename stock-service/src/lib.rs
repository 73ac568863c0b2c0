//! Stock service: catalog, availability checks and inventory deduction

pub mod config;
pub mod consumer;
pub mod gateway;
pub mod handler;
pub mod http;
pub mod middleware;
pub mod processor;
pub mod service;
pub mod store;

use std::sync::Arc;

use gateway::OrderGateway;
use middleware::{LoggingMiddleware, TelemetryMiddleware};
use processor::StockProcessor;
use service::{StockService, StockServiceImpl};
use store::StockStore;

/// Compose the service behind its decorators
pub fn build_service(
    store: Arc<dyn StockStore>,
    processor: Arc<dyn StockProcessor>,
    orders: Arc<dyn OrderGateway>,
) -> Arc<dyn StockService> {
    let service = StockServiceImpl::new(store, processor, orders);
    Arc::new(LoggingMiddleware::new(TelemetryMiddleware::new(service)))
}
