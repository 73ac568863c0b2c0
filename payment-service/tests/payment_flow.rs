//! Webhook confirmation and the `OrderCreated` consumer

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use futures::StreamExt;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

use payment_service::consumer::OrderCreatedProcessor;
use payment_service::gateway::OrderGateway;
use payment_service::processor::{DUMMY_LINK, MemoryPaymentProcessor};
use payment_service::webhook::{MAX_BODY_BYTES, WebhookState, signature_header, webhook_router};
use shared::broker::{
    Broker, MemoryBroker, Message, ORDER_CREATED_EVENT, ORDER_PAID_EVENT, RetryPolicy, Target,
    dispatch, publish_event,
};
use shared::error::{AppError, AppResult};
use shared::models::{Order, OrderStatus};

const SECRET: &str = "whsec_test";

fn app(broker: &MemoryBroker) -> Router {
    let mut state = WebhookState::new(Arc::new(broker.clone()), SECRET);
    state.publish_policy = RetryPolicy::new(2, Duration::from_millis(1));
    webhook_router(state)
}

async fn send_webhook(app: &Router, body: &[u8], signature: Option<String>) -> Response {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("content-type", "application/json");
    if let Some(signature) = signature {
        builder = builder.header("Stripe-Signature", signature);
    }
    let request = builder.body(Body::from(body.to_vec())).unwrap();
    app.clone().oneshot(request).await.unwrap()
}

async fn post_webhook(app: &Router, body: &[u8], signature: Option<String>) -> StatusCode {
    send_webhook(app, body, signature).await.status()
}

/// Error code carried by a rejected webhook
async fn rejection_code(app: &Router, body: &[u8], signature: Option<String>) -> Value {
    let response = send_webhook(app, body, signature).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let envelope: Value = serde_json::from_slice(&bytes).unwrap();
    envelope["code"].clone()
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn checkout_completed(payment_status: &str) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "id": "evt_1",
        "type": "checkout.session.completed",
        "data": {"object": {
            "id": "cs_test_1",
            "payment_status": payment_status,
            "metadata": {"orderID": "o-1", "customerID": "c-1"}
        }}
    }))
    .unwrap()
}

#[tokio::test]
async fn test_invalid_signature_is_rejected_without_publish() {
    let broker = MemoryBroker::new();
    let _paid = broker.bind_fanout(ORDER_PAID_EVENT).await.unwrap();
    let app = app(&broker);
    let body = checkout_completed("paid");

    let forged = signature_header(&body, "whsec_wrong", now());
    assert_eq!(post_webhook(&app, &body, Some(forged)).await, StatusCode::BAD_REQUEST);
    assert_eq!(post_webhook(&app, &body, None).await, StatusCode::BAD_REQUEST);

    let stale = signature_header(&body, SECRET, now() - 3600);
    assert_eq!(post_webhook(&app, &body, Some(stale)).await, StatusCode::BAD_REQUEST);

    assert_eq!(rejection_code(&app, &body, None).await, 5003);
    assert_eq!(broker.stats().published, 0);
}

#[tokio::test]
async fn test_paid_checkout_publishes_one_order_paid() {
    let broker = MemoryBroker::new();
    let queue = broker.bind_fanout(ORDER_PAID_EVENT).await.unwrap();
    let app = app(&broker);
    let body = checkout_completed("paid");

    let status = post_webhook(&app, &body, Some(signature_header(&body, SECRET, now()))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(broker.stats().published, 1);
    let mut deliveries = broker.consume(&queue).await.unwrap();
    let delivery = deliveries.next().await.unwrap().unwrap();
    let order: Order = delivery.decode().unwrap();
    assert_eq!(order.id, "o-1");
    assert_eq!(order.customer_id, "c-1");
    assert_eq!(order.status, OrderStatus::Paid);
}

#[tokio::test]
async fn test_unpaid_and_other_events_are_acknowledged_only() {
    let broker = MemoryBroker::new();
    let app = app(&broker);

    let unpaid = checkout_completed("unpaid");
    let informational = serde_json::to_vec(&json!({
        "type": "payment_intent.succeeded",
        "data": {"object": {}}
    }))
    .unwrap();
    let unknown = serde_json::to_vec(&json!({
        "type": "customer.created",
        "data": {"object": {}}
    }))
    .unwrap();

    for body in [unpaid, informational, unknown] {
        let status = post_webhook(&app, &body, Some(signature_header(&body, SECRET, now()))).await;
        assert_eq!(status, StatusCode::OK);
    }
    assert_eq!(broker.stats().published, 0);
}

#[tokio::test]
async fn test_signed_garbage_is_bad_request() {
    let broker = MemoryBroker::new();
    let app = app(&broker);
    let body = b"{not json".to_vec();

    let code = rejection_code(&app, &body, Some(signature_header(&body, SECRET, now()))).await;
    assert_eq!(code, 5004);
}

#[tokio::test]
async fn test_oversized_body_is_refused() {
    let broker = MemoryBroker::new();
    let app = app(&broker);
    let body = vec![b' '; MAX_BODY_BYTES + 1];

    let status = post_webhook(&app, &body, Some(signature_header(&body, SECRET, now()))).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_publish_failure_asks_for_redelivery() {
    let broker = MemoryBroker::new();
    let app = app(&broker);
    broker.close().await.unwrap();
    let body = checkout_completed("paid");

    let status = post_webhook(&app, &body, Some(signature_header(&body, SECRET, now()))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

/// Order service stand-in recording `UpdateOrder` calls
#[derive(Default)]
struct RecordingOrders {
    updates: Mutex<Vec<(String, String)>>,
    unavailable: bool,
}

#[async_trait]
impl OrderGateway for RecordingOrders {
    async fn update_order_after_payment_link(&self, order_id: &str, link: &str) -> AppResult<()> {
        if self.unavailable {
            return Err(AppError::service_unavailable("orders"));
        }
        self.updates
            .lock()
            .unwrap()
            .push((order_id.to_string(), link.to_string()));
        Ok(())
    }
}

fn created_order() -> Order {
    Order {
        status: OrderStatus::Pending,
        ..Order::paid("o-1", "c-1")
    }
}

#[tokio::test]
async fn test_order_created_attaches_payment_link() {
    let broker = MemoryBroker::new();
    broker.declare_queue(ORDER_CREATED_EVENT).await.unwrap();
    let orders = Arc::new(RecordingOrders::default());
    let processor = OrderCreatedProcessor::new(payment_service::build_service(
        Arc::new(MemoryPaymentProcessor::new()),
        orders.clone(),
    ));
    let policy = RetryPolicy::new(3, Duration::from_millis(1));
    publish_event(
        &broker,
        &Target::queue(ORDER_CREATED_EVENT),
        &created_order(),
        &policy,
    )
    .await
    .unwrap();

    let mut deliveries = broker.consume(ORDER_CREATED_EVENT).await.unwrap();
    let delivery = deliveries.next().await.unwrap().unwrap();
    dispatch(&broker, &processor, delivery, &policy).await;

    assert_eq!(
        *orders.updates.lock().unwrap(),
        vec![("o-1".to_string(), DUMMY_LINK.to_string())]
    );
    assert_eq!(broker.stats().acked, 1);
}

#[tokio::test]
async fn test_order_update_failure_requeues_event() {
    let broker = MemoryBroker::new();
    broker.declare_queue(ORDER_CREATED_EVENT).await.unwrap();
    let processor = OrderCreatedProcessor::new(payment_service::build_service(
        Arc::new(MemoryPaymentProcessor::new()),
        Arc::new(RecordingOrders {
            unavailable: true,
            ..Default::default()
        }),
    ));
    let policy = RetryPolicy::new(3, Duration::from_millis(1));
    publish_event(
        &broker,
        &Target::queue(ORDER_CREATED_EVENT),
        &created_order(),
        &policy,
    )
    .await
    .unwrap();

    let mut deliveries = broker.consume(ORDER_CREATED_EVENT).await.unwrap();
    let delivery = deliveries.next().await.unwrap().unwrap();
    dispatch(&broker, &processor, delivery, &policy).await;

    let retried = deliveries.next().await.unwrap().unwrap();
    assert_eq!(retried.retry_count(), 1);
    let order: Order = retried.decode().unwrap();
    assert_eq!(order.id, "o-1");
}

#[tokio::test]
async fn test_malformed_order_created_is_discarded() {
    let broker = MemoryBroker::new();
    broker.declare_queue(ORDER_CREATED_EVENT).await.unwrap();
    broker
        .publish(
            &Target::queue(ORDER_CREATED_EVENT),
            Message {
                body: b"[]".to_vec(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let processor = OrderCreatedProcessor::new(payment_service::build_service(
        Arc::new(MemoryPaymentProcessor::new()),
        Arc::new(RecordingOrders::default()),
    ));

    let mut deliveries = broker.consume(ORDER_CREATED_EVENT).await.unwrap();
    let delivery = deliveries.next().await.unwrap().unwrap();
    dispatch(
        &broker,
        &processor,
        delivery,
        &RetryPolicy::new(3, Duration::from_millis(1)),
    )
    .await;

    assert_eq!(broker.stats().nacked, 1);
}

