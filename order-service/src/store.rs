//! Order persistence

use async_trait::async_trait;
use dashmap::DashMap;

use shared::error::{AppError, AppResult};
use shared::models::{Item, Order, OrderStatus};

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persist a new `pending` order and assign its id
    async fn create(&self, customer_id: &str, items: Vec<Item>) -> AppResult<Order>;

    /// Point lookup scoped to the owning customer
    async fn get(&self, order_id: &str, customer_id: &str) -> AppResult<Order>;

    /// Overwrite status and payment link. Items are left untouched.
    async fn update(&self, order_id: &str, status: OrderStatus, payment_link: &str)
    -> AppResult<Order>;
}

/// In-process order store
#[derive(Default)]
pub struct MemoryOrderStore {
    orders: DashMap<String, Order>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn create(&self, customer_id: &str, items: Vec<Item>) -> AppResult<Order> {
        let order = Order {
            id: uuid::Uuid::new_v4().to_string(),
            customer_id: customer_id.to_string(),
            status: OrderStatus::Pending,
            items,
            payment_link: String::new(),
        };
        self.orders.insert(order.id.clone(), order.clone());
        Ok(order)
    }

    async fn get(&self, order_id: &str, customer_id: &str) -> AppResult<Order> {
        self.orders
            .get(order_id)
            .filter(|order| order.customer_id == customer_id)
            .map(|order| order.clone())
            .ok_or_else(|| AppError::order_not_found(order_id))
    }

    async fn update(
        &self,
        order_id: &str,
        status: OrderStatus,
        payment_link: &str,
    ) -> AppResult<Order> {
        let mut order = self
            .orders
            .get_mut(order_id)
            .ok_or_else(|| AppError::order_not_found(order_id))?;
        order.status = status;
        order.payment_link = payment_link.to_string();
        Ok(order.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::error::ErrorCode;

    fn item(id: &str, quantity: i32) -> Item {
        Item {
            id: id.into(),
            name: format!("item {id}"),
            quantity,
            price_id: format!("price_{id}"),
        }
    }

    #[tokio::test]
    async fn test_create_assigns_id_and_pending_status() {
        let store = MemoryOrderStore::new();
        let a = store.create("c-1", vec![item("i-1", 2)]).await.unwrap();
        let b = store.create("c-1", vec![item("i-1", 2)]).await.unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(a.status, OrderStatus::Pending);
        assert!(a.payment_link.is_empty());
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_get_is_scoped_to_customer() {
        let store = MemoryOrderStore::new();
        let order = store.create("c-1", vec![item("i-1", 1)]).await.unwrap();

        assert_eq!(store.get(&order.id, "c-1").await.unwrap().id, order.id);
        let err = store.get(&order.id, "c-2").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderNotFound);
    }

    #[tokio::test]
    async fn test_update_sets_status_and_link_only() {
        let store = MemoryOrderStore::new();
        let order = store.create("c-1", vec![item("i-1", 3)]).await.unwrap();

        let updated = store
            .update(&order.id, OrderStatus::WaitingPayment, "https://pay/1")
            .await
            .unwrap();
        assert_eq!(updated.status, OrderStatus::WaitingPayment);
        assert_eq!(updated.payment_link, "https://pay/1");
        assert_eq!(updated.items, order.items);
    }

    #[tokio::test]
    async fn test_update_unknown_order() {
        let store = MemoryOrderStore::new();
        let err = store
            .update("missing", OrderStatus::Paid, "")
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderNotFound);
    }
}
