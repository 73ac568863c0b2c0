//! Order Model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{AppError, AppResult, ErrorCode};

/// Order lifecycle status
///
/// `Pending -> WaitingPayment -> Paid`. Nothing in the type forbids other
/// transitions; `UpdateOrder` callers are trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    WaitingPayment,
    Paid,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::WaitingPayment => "waiting_payment",
            Self::Paid => "paid",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "waiting_payment" => Ok(Self::WaitingPayment),
            "paid" => Ok(Self::Paid),
            other => Err(format!("unknown order status: {other}")),
        }
    }
}

/// A validated order line, priced by the stock service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub quantity: i32,
    /// Processor-side price reference
    #[serde(rename = "priceID", default)]
    pub price_id: String,
}

/// A requested order line: item reference plus quantity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemWithQuantity {
    pub id: String,
    pub quantity: i32,
}

impl ItemWithQuantity {
    pub fn new(id: impl Into<String>, quantity: i32) -> Self {
        Self {
            id: id.into(),
            quantity,
        }
    }
}

/// Reject empty requests, lines without an id and non-positive quantities
pub fn validate_items(items: &[ItemWithQuantity]) -> AppResult<()> {
    if items.is_empty() {
        return Err(AppError::new(ErrorCode::OrderItemsEmpty));
    }
    for item in items {
        if item.id.is_empty() {
            return Err(AppError::new(ErrorCode::OrderItemIdMissing));
        }
        if item.quantity <= 0 {
            return Err(AppError::new(ErrorCode::OrderInvalidQuantity)
                .with_detail("item_id", item.id.clone())
                .with_detail("quantity", item.quantity));
        }
    }
    Ok(())
}

/// Order entity, also the body of `OrderCreated` and `OrderPaid` events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    #[serde(rename = "customerID")]
    pub customer_id: String,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(rename = "paymentLink", default)]
    pub payment_link: String,
}

impl Order {
    /// Minimal record published when the processor confirms payment
    pub fn paid(id: impl Into<String>, customer_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            customer_id: customer_id.into(),
            status: OrderStatus::Paid,
            items: Vec::new(),
            payment_link: String::new(),
        }
    }

    /// Page the customer lands on after checkout, `<base>/success.html?customerID=..&orderID=..`
    pub fn success_url(&self, base: &str) -> String {
        format!(
            "{base}/success.html?customerID={}&orderID={}",
            urlencoding::encode(&self.customer_id),
            urlencoding::encode(&self.id)
        )
    }
}

// ========== RPC payloads ==========

/// `OrderService/CreateOrder` request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    #[serde(rename = "customerID")]
    pub customer_id: String,
    pub items: Vec<ItemWithQuantity>,
}

/// `OrderService/GetOrder` and `OrderService/GetOrderForStockUpdate` request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetOrderRequest {
    #[serde(rename = "orderID")]
    pub order_id: String,
    #[serde(rename = "customerID")]
    pub customer_id: String,
}

/// `OrderService/UpdateOrder` request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateOrderRequest {
    #[serde(rename = "orderID")]
    pub order_id: String,
    pub status: OrderStatus,
    #[serde(rename = "paymentLink", default)]
    pub payment_link: String,
}
