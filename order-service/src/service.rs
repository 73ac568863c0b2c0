//! Order Service
//!
//! Validates requested lines, checks them against stock, persists the order
//! and announces it on the `OrderCreatedEvent` queue for the payment service.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use shared::broker::{self, Broker, ORDER_CREATED_EVENT, RetryPolicy, Target};
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{CreateOrderRequest, ItemWithQuantity, Order, OrderStatus, validate_items};

use crate::gateway::StockGateway;
use crate::store::OrderStore;

#[async_trait]
pub trait OrderService: Send + Sync {
    async fn create_order(&self, request: CreateOrderRequest) -> AppResult<Order>;

    async fn get_order(&self, order_id: &str, customer_id: &str) -> AppResult<Order>;

    /// Set status and payment link. Any transition is accepted: callers of
    /// this RPC (the payment service) are trusted.
    async fn update_order(
        &self,
        order_id: &str,
        status: OrderStatus,
        payment_link: &str,
    ) -> AppResult<Order>;

    /// Order lines for the stock deduction path
    async fn get_order_for_stock_update(&self, order_id: &str, customer_id: &str)
    -> AppResult<Order>;
}

pub struct OrderServiceImpl {
    store: Arc<dyn OrderStore>,
    stock: Arc<dyn StockGateway>,
    broker: Arc<dyn Broker>,
    publish_policy: RetryPolicy,
}

impl OrderServiceImpl {
    pub fn new(
        store: Arc<dyn OrderStore>,
        stock: Arc<dyn StockGateway>,
        broker: Arc<dyn Broker>,
    ) -> Self {
        Self {
            store,
            stock,
            broker,
            publish_policy: RetryPolicy::default(),
        }
    }

    pub fn with_publish_policy(mut self, policy: RetryPolicy) -> Self {
        self.publish_policy = policy;
        self
    }
}

/// Sum duplicate lines per item id, keeping the order in which ids first appear
///
/// A summed quantity that does not fit in `i32` is an `OrderInvalidQuantity`.
pub fn merge_items(items: &[ItemWithQuantity]) -> AppResult<Vec<ItemWithQuantity>> {
    let mut merged: Vec<ItemWithQuantity> = Vec::with_capacity(items.len());
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(items.len());

    for item in items {
        match index.get(item.id.as_str()) {
            Some(&i) => {
                let line = &mut merged[i];
                line.quantity = line.quantity.checked_add(item.quantity).ok_or_else(|| {
                    AppError::with_message(
                        ErrorCode::OrderInvalidQuantity,
                        "Combined quantity is too large",
                    )
                    .with_detail("item_id", item.id.clone())
                })?;
            }
            None => {
                index.insert(item.id.as_str(), merged.len());
                merged.push(item.clone());
            }
        }
    }
    Ok(merged)
}

#[async_trait]
impl OrderService for OrderServiceImpl {
    async fn create_order(&self, request: CreateOrderRequest) -> AppResult<Order> {
        if request.customer_id.is_empty() {
            return Err(AppError::with_message(
                ErrorCode::RequiredField,
                "customerID is required",
            ));
        }
        validate_items(&request.items)?;
        let merged = merge_items(&request.items)?;

        let stock = self.stock.check_if_items_in_stock(&merged).await?;
        if !stock.in_stock {
            return Err(AppError::insufficient_stock());
        }

        let order = self.store.create(&request.customer_id, stock.items).await?;

        // The order stays persisted when this fails; nothing rolls it back
        broker::publish_event(
            self.broker.as_ref(),
            &Target::queue(ORDER_CREATED_EVENT),
            &order,
            &self.publish_policy,
        )
        .await
        .map_err(|e| {
            tracing::error!(order_id = %order.id, error = %e, "order persisted but OrderCreated was not published");
            AppError::from(e).with_detail("order_id", order.id.clone())
        })?;

        tracing::info!(order_id = %order.id, customer_id = %order.customer_id, "order created");
        Ok(order)
    }

    async fn get_order(&self, order_id: &str, customer_id: &str) -> AppResult<Order> {
        self.store.get(order_id, customer_id).await
    }

    async fn update_order(
        &self,
        order_id: &str,
        status: OrderStatus,
        payment_link: &str,
    ) -> AppResult<Order> {
        if order_id.is_empty() {
            return Err(AppError::with_message(
                ErrorCode::RequiredField,
                "orderID is required",
            ));
        }
        self.store.update(order_id, status, payment_link).await
    }

    async fn get_order_for_stock_update(
        &self,
        order_id: &str,
        customer_id: &str,
    ) -> AppResult<Order> {
        self.store.get(order_id, customer_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: &str, quantity: i32) -> ItemWithQuantity {
        ItemWithQuantity::new(id, quantity)
    }

    #[test]
    fn test_merge_sums_duplicates() {
        let merged = merge_items(&[line("a", 2), line("b", 1), line("a", 3)]).unwrap();
        assert_eq!(merged, vec![line("a", 5), line("b", 1)]);
    }

    #[test]
    fn test_merge_rejects_overflowing_quantity() {
        let err = merge_items(&[line("a", i32::MAX), line("b", 1), line("a", 2)]).unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderInvalidQuantity);

        let merged = merge_items(&[line("a", i32::MAX - 2), line("a", 2)]).unwrap();
        assert_eq!(merged, vec![line("a", i32::MAX)]);
    }

    #[test]
    fn test_merge_keeps_distinct_lines() {
        let items = vec![line("x", 1), line("y", 2), line("z", 3)];
        assert_eq!(merge_items(&items).unwrap(), items);
    }

    #[test]
    fn test_merge_total_quantity_is_preserved() {
        let items = vec![
            line("a", 1),
            line("b", 4),
            line("a", 2),
            line("c", 7),
            line("b", 1),
            line("a", 3),
        ];
        let merged = merge_items(&items).unwrap();

        let mut ids: Vec<_> = merged.iter().map(|i| i.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), merged.len());
        for id in ["a", "b", "c"] {
            let expected: i32 = items.iter().filter(|i| i.id == id).map(|i| i.quantity).sum();
            let got = merged.iter().find(|i| i.id == id).unwrap().quantity;
            assert_eq!(got, expected);
        }
    }

    #[test]
    fn test_validate_rejects_empty() {
        let err = validate_items(&[]).unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderItemsEmpty);
    }

    #[test]
    fn test_validate_rejects_missing_id() {
        let err = validate_items(&[line("", 1)]).unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderItemIdMissing);
    }

    #[test]
    fn test_validate_rejects_non_positive_quantity() {
        for quantity in [0, -1] {
            let err = validate_items(&[line("a", 1), line("b", quantity)]).unwrap_err();
            assert_eq!(err.code, ErrorCode::OrderInvalidQuantity);
        }
    }
}
