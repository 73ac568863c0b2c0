//! RPC surface of the order service

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use shared::models::{CreateOrderRequest, GetOrderRequest, Order, UpdateOrderRequest};
use shared::rpc::{RpcResult, methods, propagate_trace, reply, rpc_path};

use crate::service::OrderService;

pub type SharedOrderService = Arc<dyn OrderService>;

pub fn rpc_router(service: SharedOrderService) -> Router {
    Router::new()
        .route(&rpc_path(methods::CREATE_ORDER), post(create_order))
        .route(&rpc_path(methods::GET_ORDER), post(get_order))
        .route(&rpc_path(methods::UPDATE_ORDER), post(update_order))
        .route(
            &rpc_path(methods::GET_ORDER_FOR_STOCK_UPDATE),
            post(get_order_for_stock_update),
        )
        .layer(axum::middleware::from_fn(propagate_trace))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

async fn create_order(
    State(service): State<SharedOrderService>,
    Json(req): Json<CreateOrderRequest>,
) -> RpcResult<Order> {
    reply(service.create_order(req).await?)
}

async fn get_order(
    State(service): State<SharedOrderService>,
    Json(req): Json<GetOrderRequest>,
) -> RpcResult<Order> {
    reply(service.get_order(&req.order_id, &req.customer_id).await?)
}

async fn update_order(
    State(service): State<SharedOrderService>,
    Json(req): Json<UpdateOrderRequest>,
) -> RpcResult<Order> {
    reply(
        service
            .update_order(&req.order_id, req.status, &req.payment_link)
            .await?,
    )
}

async fn get_order_for_stock_update(
    State(service): State<SharedOrderService>,
    Json(req): Json<GetOrderRequest>,
) -> RpcResult<Order> {
    reply(
        service
            .get_order_for_stock_update(&req.order_id, &req.customer_id)
            .await?,
    )
}
