//! Typed RPC clients for the order and stock services

use async_trait::async_trait;
use std::sync::Arc;

use shared::discovery::Registry;
use shared::error::AppResult;
use shared::models::{
    CreateItemRequest, CreateItemResponse, CreateOrderRequest, GetOrderRequest, ItemIdRequest,
    Order, StockItem, UpdateItemRequest, UpdateStockItemRequest, UpdateStockQuantityRequest,
};
use shared::rpc::{self, ORDER_SERVICE, RpcChannel, STOCK_SERVICE, methods};

#[async_trait]
pub trait OrdersGateway: Send + Sync {
    async fn create_order(&self, request: &CreateOrderRequest) -> AppResult<Order>;

    async fn get_order(&self, order_id: &str, customer_id: &str) -> AppResult<Order>;
}

#[async_trait]
pub trait StocksGateway: Send + Sync {
    async fn create_item(&self, request: &CreateItemRequest) -> AppResult<String>;

    async fn get_items(&self) -> AppResult<Vec<StockItem>>;

    async fn get_item(&self, id: &str) -> AppResult<StockItem>;

    async fn update_item(&self, id: &str, request: UpdateItemRequest) -> AppResult<StockItem>;

    async fn update_stock(&self, id: &str, quantity: i64) -> AppResult<StockItem>;

    async fn delete_item(&self, id: &str) -> AppResult<()>;
}

/// Both gateways over one registry; every call resolves its peer afresh
pub struct RpcGateway {
    registry: Arc<dyn Registry>,
}

impl RpcGateway {
    pub fn new(registry: Arc<dyn Registry>) -> Self {
        Self { registry }
    }

    async fn orders(&self) -> AppResult<RpcChannel> {
        rpc::connect(ORDER_SERVICE, self.registry.as_ref()).await
    }

    async fn stocks(&self) -> AppResult<RpcChannel> {
        rpc::connect(STOCK_SERVICE, self.registry.as_ref()).await
    }
}

#[async_trait]
impl OrdersGateway for RpcGateway {
    async fn create_order(&self, request: &CreateOrderRequest) -> AppResult<Order> {
        self.orders()
            .await?
            .call(methods::CREATE_ORDER, request)
            .await
    }

    async fn get_order(&self, order_id: &str, customer_id: &str) -> AppResult<Order> {
        self.orders()
            .await?
            .call(
                methods::GET_ORDER,
                &GetOrderRequest {
                    order_id: order_id.to_string(),
                    customer_id: customer_id.to_string(),
                },
            )
            .await
    }
}

#[async_trait]
impl StocksGateway for RpcGateway {
    async fn create_item(&self, request: &CreateItemRequest) -> AppResult<String> {
        let created: CreateItemResponse = self
            .stocks()
            .await?
            .call(methods::CREATE_STOCK_ITEM, request)
            .await?;
        Ok(created.id)
    }

    async fn get_items(&self) -> AppResult<Vec<StockItem>> {
        self.stocks()
            .await?
            .call(methods::GET_STOCK_ITEMS, &serde_json::json!({}))
            .await
    }

    async fn get_item(&self, id: &str) -> AppResult<StockItem> {
        self.stocks()
            .await?
            .call(methods::GET_STOCK_ITEM, &ItemIdRequest { id: id.to_string() })
            .await
    }

    async fn update_item(&self, id: &str, request: UpdateItemRequest) -> AppResult<StockItem> {
        self.stocks()
            .await?
            .call(
                methods::UPDATE_STOCK_ITEM,
                &UpdateStockItemRequest {
                    id: id.to_string(),
                    update: request,
                },
            )
            .await
    }

    async fn update_stock(&self, id: &str, quantity: i64) -> AppResult<StockItem> {
        self.stocks()
            .await?
            .call(
                methods::UPDATE_STOCK_QUANTITY,
                &UpdateStockQuantityRequest {
                    id: id.to_string(),
                    quantity,
                },
            )
            .await
    }

    async fn delete_item(&self, id: &str) -> AppResult<()> {
        self.stocks()
            .await?
            .call_empty(methods::DELETE_ITEM, &ItemIdRequest { id: id.to_string() })
            .await
    }
}
