//! Order RPC surface driven through the real router

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures::StreamExt;
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use order_service::gateway::StockGateway;
use order_service::handler::rpc_router;
use order_service::service::{OrderService, OrderServiceImpl};
use order_service::store::MemoryOrderStore;
use shared::broker::{Broker, MemoryBroker, ORDER_CREATED_EVENT, RetryPolicy};
use shared::error::AppResult;
use shared::models::{CheckStockResponse, Item, ItemWithQuantity, Order, OrderStatus};
use shared::rpc::{methods, rpc_path};

/// Catalog answering stock checks all-or-nothing
struct FakeStock {
    catalog: HashMap<String, i32>,
}

impl FakeStock {
    fn with(id: &str, quantity: i32) -> Arc<Self> {
        Arc::new(Self {
            catalog: HashMap::from([(id.to_string(), quantity)]),
        })
    }
}

#[async_trait]
impl StockGateway for FakeStock {
    async fn check_if_items_in_stock(
        &self,
        items: &[ItemWithQuantity],
    ) -> AppResult<CheckStockResponse> {
        let in_stock = items
            .iter()
            .all(|i| self.catalog.get(&i.id).copied().unwrap_or(0) >= i.quantity);
        if !in_stock {
            return Ok(CheckStockResponse {
                in_stock: false,
                items: Vec::new(),
            });
        }
        Ok(CheckStockResponse {
            in_stock: true,
            items: items
                .iter()
                .map(|i| Item {
                    id: i.id.clone(),
                    name: format!("Product {}", i.id),
                    quantity: i.quantity,
                    price_id: format!("price_{}", i.id),
                })
                .collect(),
        })
    }
}

struct Harness {
    app: Router,
    store: Arc<MemoryOrderStore>,
    broker: MemoryBroker,
}

fn harness(stock: Arc<FakeStock>) -> Harness {
    let store = Arc::new(MemoryOrderStore::new());
    let broker = MemoryBroker::new();
    let service = OrderServiceImpl::new(store.clone(), stock, Arc::new(broker.clone()))
        .with_publish_policy(RetryPolicy::new(2, Duration::from_millis(1)));
    let service: Arc<dyn OrderService> = Arc::new(service);
    Harness {
        app: rpc_router(service),
        store,
        broker,
    }
}

async fn call<T: Serialize>(app: &Router, method: &str, body: &T) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(rpc_path(method))
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn create_request() -> Value {
    json!({
        "customerID": "c-1",
        "items": [
            {"id": "item-1", "quantity": 2},
            {"id": "item-1", "quantity": 3}
        ]
    })
}

#[tokio::test]
async fn test_duplicate_lines_are_merged_before_stock_check() {
    // 2 + 3 = 5 exceeds a stock of 4 even though each line alone fits
    let h = harness(FakeStock::with("item-1", 4));

    let (status, body) = call(&h.app, methods::CREATE_ORDER, &create_request()).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 4005);
    assert!(h.store.is_empty());
    assert_eq!(h.broker.stats().published, 0);
}

#[tokio::test]
async fn test_order_created_with_one_merged_line() {
    let h = harness(FakeStock::with("item-1", 10));
    let mut created = h.broker.consume(ORDER_CREATED_EVENT).await.unwrap();

    let (status, body) = call(&h.app, methods::CREATE_ORDER, &create_request()).await;

    assert_eq!(status, StatusCode::OK);
    let order: Order = serde_json::from_value(body["data"].clone()).unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.items.len(), 1);
    assert_eq!(order.items[0].quantity, 5);
    assert_eq!(order.items[0].price_id, "price_item-1");
    assert!(order.payment_link.is_empty());

    // The consumer side decodes exactly what was persisted
    let delivery = created.next().await.unwrap().unwrap();
    let event: Order = delivery.decode().unwrap();
    assert_eq!(event, order);
}

#[tokio::test]
async fn test_invalid_lines_are_rejected_without_side_effects() {
    let h = harness(FakeStock::with("item-1", 10));

    let cases = [
        (json!({"customerID": "c-1", "items": []}), 4002),
        (json!({"customerID": "c-1", "items": [{"id": "", "quantity": 1}]}), 4004),
        (json!({"customerID": "c-1", "items": [{"id": "item-1", "quantity": 0}]}), 4003),
        (json!({"customerID": "", "items": [{"id": "item-1", "quantity": 1}]}), 7),
    ];
    for (request, code) in cases {
        let (status, body) = call(&h.app, methods::CREATE_ORDER, &request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{request}");
        assert_eq!(body["code"], code, "{request}");
    }
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn test_overflowing_merged_quantity_is_rejected() {
    let h = harness(FakeStock::with("item-1", 4));
    let request = json!({
        "customerID": "c-1",
        "items": [
            {"id": "item-1", "quantity": i32::MAX},
            {"id": "item-1", "quantity": 2}
        ]
    });

    let (status, body) = call(&h.app, methods::CREATE_ORDER, &request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 4003);
    assert!(h.store.is_empty());
    assert_eq!(h.broker.stats().published, 0);
}

#[tokio::test]
async fn test_get_and_update_order() {
    let h = harness(FakeStock::with("item-1", 10));
    let (_, body) = call(&h.app, methods::CREATE_ORDER, &create_request()).await;
    let order_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = call(
        &h.app,
        methods::UPDATE_ORDER,
        &json!({"orderID": order_id, "status": "waiting_payment", "paymentLink": "https://pay/x"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "waiting_payment");

    let (status, body) = call(
        &h.app,
        methods::GET_ORDER,
        &json!({"orderID": order_id, "customerID": "c-1"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["paymentLink"], "https://pay/x");
    assert_eq!(body["data"]["items"][0]["quantity"], 5);

    let (status, body) = call(
        &h.app,
        methods::GET_ORDER_FOR_STOCK_UPDATE,
        &json!({"orderID": order_id, "customerID": "c-1"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["items"][0]["id"], "item-1");
}

#[tokio::test]
async fn test_unknown_order_is_not_found() {
    let h = harness(FakeStock::with("item-1", 10));

    let (status, body) = call(
        &h.app,
        methods::GET_ORDER,
        &json!({"orderID": "nope", "customerID": "c-1"}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 4001);
}

#[tokio::test]
async fn test_publish_failure_keeps_order_and_reports_broker_error() {
    let h = harness(FakeStock::with("item-1", 10));
    h.broker.close().await.unwrap();

    let (status, body) = call(&h.app, methods::CREATE_ORDER, &create_request()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], 9201);
    assert!(body["details"]["order_id"].is_string());
    assert_eq!(h.store.len(), 1);
}
