//! RPC connection broker
//!
//! Services talk to each other with JSON over HTTP: `POST /rpc/<Service>/<Method>`,
//! answered with an [`ApiResponse`](crate::error::ApiResponse) envelope.

mod client;
mod server;

pub use client::{RPC_TIMEOUT, RpcChannel, connect};
pub use server::{RpcResult, propagate_trace, reply};

/// Logical names under which services register
pub const ORDER_SERVICE: &str = "orders";
pub const STOCK_SERVICE: &str = "stocks";
pub const PAYMENT_SERVICE: &str = "payment";
pub const GATEWAY_SERVICE: &str = "gateway";

/// RPC method names
pub mod methods {
    pub const CREATE_ORDER: &str = "OrderService/CreateOrder";
    pub const GET_ORDER: &str = "OrderService/GetOrder";
    pub const UPDATE_ORDER: &str = "OrderService/UpdateOrder";
    pub const GET_ORDER_FOR_STOCK_UPDATE: &str = "OrderService/GetOrderForStockUpdate";

    pub const CHECK_IF_ITEMS_IN_STOCK: &str = "StockService/CheckIfItemsInStock";
    pub const CREATE_STOCK_ITEM: &str = "StockService/CreateStockItem";
    pub const GET_STOCK_ITEM: &str = "StockService/GetStockItem";
    pub const GET_STOCK_ITEMS: &str = "StockService/GetStockItems";
    pub const UPDATE_STOCK_ITEM: &str = "StockService/UpdateStockItem";
    pub const UPDATE_STOCK_QUANTITY: &str = "StockService/UpdateStockQuantity";
    pub const DELETE_ITEM: &str = "StockService/DeleteItem";
}

/// Route path of an RPC method
pub fn rpc_path(method: &str) -> String {
    format!("/rpc/{method}")
}
