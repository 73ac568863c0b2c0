//! Catalog management over plain HTTP

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use tower_http::trace::TraceLayer;

use shared::error::{ApiResponse, AppResult};
use shared::models::{CreateItemRequest, CreateItemResponse, StockItem, UpdateItemRequest};

use crate::handler::SharedStockService;

pub fn catalog_router(service: SharedStockService) -> Router {
    Router::new()
        .route("/stocks", get(list_items).post(create_item))
        .route(
            "/stocks/{id}",
            get(get_item).put(update_item).delete(delete_item),
        )
        .route("/stocks/{id}/{quantity}", put(update_stock))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

async fn list_items(
    State(service): State<SharedStockService>,
) -> AppResult<Json<ApiResponse<Vec<StockItem>>>> {
    Ok(Json(ApiResponse::success(service.get_items().await?)))
}

async fn create_item(
    State(service): State<SharedStockService>,
    Json(req): Json<CreateItemRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<CreateItemResponse>>)> {
    let id = service.create_item(req).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(CreateItemResponse { id })),
    ))
}

async fn get_item(
    State(service): State<SharedStockService>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<StockItem>>> {
    Ok(Json(ApiResponse::success(service.get_item(&id).await?)))
}

async fn update_item(
    State(service): State<SharedStockService>,
    Path(id): Path<String>,
    Json(req): Json<UpdateItemRequest>,
) -> AppResult<Json<ApiResponse<StockItem>>> {
    Ok(Json(ApiResponse::success(
        service.update_item(&id, req).await?,
    )))
}

async fn update_stock(
    State(service): State<SharedStockService>,
    Path((id, quantity)): Path<(String, i64)>,
) -> AppResult<Json<ApiResponse<StockItem>>> {
    Ok(Json(ApiResponse::success(
        service.update_stock(&id, quantity).await?,
    )))
}

async fn delete_item(
    State(service): State<SharedStockService>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<()>>> {
    service.delete_item(&id).await?;
    Ok(Json(ApiResponse::ok()))
}
