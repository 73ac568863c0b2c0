//! RPC surface of the stock service

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use shared::models::{
    CheckStockRequest, CheckStockResponse, CreateItemRequest, CreateItemResponse, ItemIdRequest,
    StockItem, UpdateStockItemRequest, UpdateStockQuantityRequest,
};
use shared::rpc::{RpcResult, methods, propagate_trace, reply, rpc_path};

use crate::service::StockService;

pub type SharedStockService = Arc<dyn StockService>;

pub fn rpc_router(service: SharedStockService) -> Router {
    Router::new()
        .route(
            &rpc_path(methods::CHECK_IF_ITEMS_IN_STOCK),
            post(check_if_items_in_stock),
        )
        .route(&rpc_path(methods::CREATE_STOCK_ITEM), post(create_stock_item))
        .route(&rpc_path(methods::GET_STOCK_ITEM), post(get_stock_item))
        .route(&rpc_path(methods::GET_STOCK_ITEMS), post(get_stock_items))
        .route(&rpc_path(methods::UPDATE_STOCK_ITEM), post(update_stock_item))
        .route(
            &rpc_path(methods::UPDATE_STOCK_QUANTITY),
            post(update_stock_quantity),
        )
        .route(&rpc_path(methods::DELETE_ITEM), post(delete_item))
        .layer(axum::middleware::from_fn(propagate_trace))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

async fn check_if_items_in_stock(
    State(service): State<SharedStockService>,
    Json(req): Json<CheckStockRequest>,
) -> RpcResult<CheckStockResponse> {
    reply(service.check_if_items_in_stock(&req.items).await?)
}

async fn create_stock_item(
    State(service): State<SharedStockService>,
    Json(req): Json<CreateItemRequest>,
) -> RpcResult<CreateItemResponse> {
    let id = service.create_item(req).await?;
    reply(CreateItemResponse { id })
}

async fn get_stock_item(
    State(service): State<SharedStockService>,
    Json(req): Json<ItemIdRequest>,
) -> RpcResult<StockItem> {
    reply(service.get_item(&req.id).await?)
}

async fn get_stock_items(State(service): State<SharedStockService>) -> RpcResult<Vec<StockItem>> {
    reply(service.get_items().await?)
}

async fn update_stock_item(
    State(service): State<SharedStockService>,
    Json(req): Json<UpdateStockItemRequest>,
) -> RpcResult<StockItem> {
    reply(service.update_item(&req.id, req.update).await?)
}

async fn update_stock_quantity(
    State(service): State<SharedStockService>,
    Json(req): Json<UpdateStockQuantityRequest>,
) -> RpcResult<StockItem> {
    reply(service.update_stock(&req.id, req.quantity).await?)
}

async fn delete_item(
    State(service): State<SharedStockService>,
    Json(req): Json<ItemIdRequest>,
) -> RpcResult<()> {
    service.delete_item(&req.id).await?;
    reply(())
}
