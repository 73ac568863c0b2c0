//! Stock (catalog) Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::order::{Item, ItemWithQuantity};

/// Catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockItem {
    pub id: String,
    /// Processor-side product reference
    #[serde(rename = "productID")]
    pub product_id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub currency: String,
    /// Processor-side price reference
    #[serde(rename = "priceID")]
    pub price_id: String,
    /// Authoritative available count, never negative
    pub quantity: i64,
    /// Soft-delete flag
    pub active: bool,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create stock item payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateItemRequest {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub currency: String,
    pub quantity: i64,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Update stock item payload (partial)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateItemRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub metadata: Option<HashMap<String, String>>,
}

// ========== RPC payloads ==========

/// `StockService/CheckIfItemsInStock` request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckStockRequest {
    pub items: Vec<ItemWithQuantity>,
}

/// `StockService/CheckIfItemsInStock` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckStockResponse {
    #[serde(rename = "inStock")]
    pub in_stock: bool,
    #[serde(default)]
    pub items: Vec<Item>,
}

/// Request addressing a single catalog item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemIdRequest {
    pub id: String,
}

/// `StockService/UpdateStockItem` request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStockItemRequest {
    pub id: String,
    #[serde(flatten)]
    pub update: UpdateItemRequest,
}

/// `StockService/UpdateStockQuantity` request (absolute set)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStockQuantityRequest {
    pub id: String,
    pub quantity: i64,
}

/// `StockService/CreateStockItem` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateItemResponse {
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_stock_item_request_flattens() {
        let req: UpdateStockItemRequest =
            serde_json::from_str(r#"{"id":"i-1","price":12.5}"#).unwrap();
        assert_eq!(req.id, "i-1");
        assert_eq!(req.update.price, Some(12.5));
        assert!(req.update.name.is_none());
    }

    #[test]
    fn test_check_stock_response_wire_names() {
        let resp = CheckStockResponse {
            in_stock: false,
            items: Vec::new(),
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["inStock"], false);
    }
}
