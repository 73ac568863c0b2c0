//! Public REST routes

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use shared::error::{ApiResponse, AppResult};
use shared::models::{
    CreateItemRequest, CreateItemResponse, CreateOrderRequest, ItemWithQuantity, Order, StockItem,
    UpdateItemRequest, validate_items,
};

use crate::clients::{OrdersGateway, StocksGateway};

#[derive(Clone)]
pub struct AppState {
    pub orders: Arc<dyn OrdersGateway>,
    pub stocks: Arc<dyn StocksGateway>,
    /// Public base URL used in customer redirects
    pub public_addr: Arc<str>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateOrderResponse {
    pub order: Order,
    #[serde(rename = "redirectToURL")]
    pub redirect_to_url: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/customers/{customer_id}/orders", post(create_order))
        .route(
            "/customers/{customer_id}/orders/{order_id}",
            get(get_order),
        )
        .route("/stocks", get(get_items).post(create_item))
        .route(
            "/stocks/{id}",
            get(get_item).put(update_item).delete(delete_item),
        )
        .route("/stocks/{id}/{quantity}", put(update_stock))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn create_order(
    State(state): State<AppState>,
    Path(customer_id): Path<String>,
    Json(items): Json<Vec<ItemWithQuantity>>,
) -> AppResult<(StatusCode, Json<ApiResponse<CreateOrderResponse>>)> {
    validate_items(&items)?;

    let order = state
        .orders
        .create_order(&CreateOrderRequest { customer_id, items })
        .await?;
    let redirect_to_url = order.success_url(&state.public_addr);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(CreateOrderResponse {
            order,
            redirect_to_url,
        })),
    ))
}

async fn get_order(
    State(state): State<AppState>,
    Path((customer_id, order_id)): Path<(String, String)>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order = state.orders.get_order(&order_id, &customer_id).await?;
    Ok(Json(ApiResponse::success(order)))
}

async fn create_item(
    State(state): State<AppState>,
    Json(request): Json<CreateItemRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<CreateItemResponse>>)> {
    let id = state.stocks.create_item(&request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(CreateItemResponse { id })),
    ))
}

async fn get_items(State(state): State<AppState>) -> AppResult<Json<ApiResponse<Vec<StockItem>>>> {
    Ok(Json(ApiResponse::success(state.stocks.get_items().await?)))
}

async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<StockItem>>> {
    Ok(Json(ApiResponse::success(state.stocks.get_item(&id).await?)))
}

async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateItemRequest>,
) -> AppResult<Json<ApiResponse<StockItem>>> {
    Ok(Json(ApiResponse::success(
        state.stocks.update_item(&id, request).await?,
    )))
}

async fn update_stock(
    State(state): State<AppState>,
    Path((id, quantity)): Path<(String, i64)>,
) -> AppResult<Json<ApiResponse<StockItem>>> {
    Ok(Json(ApiResponse::success(
        state.stocks.update_stock(&id, quantity).await?,
    )))
}

async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.stocks.delete_item(&id).await?;
    Ok(Json(ApiResponse::ok()))
}
