//! Unified error codes for the order-fulfillment services
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 4xxx: Order errors
//! - 5xxx: Payment errors
//! - 6xxx: Stock errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// Codes travel as plain u16 values inside every RPC and HTTP error envelope,
/// so a caller in another process can rebuild the same [`ErrorCode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Resource not found
    NotFound = 3,
    /// Required field missing
    RequiredField = 7,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Order has no item lines
    OrderItemsEmpty = 4002,
    /// Order line quantity must be positive
    OrderInvalidQuantity = 4003,
    /// Order line is missing its item id
    OrderItemIdMissing = 4004,
    /// Requested quantities exceed available stock
    InsufficientStock = 4005,

    // ==================== 5xxx: Payment ====================
    /// Payment link could not be created
    PaymentLinkFailed = 5002,
    /// Webhook signature verification failed
    WebhookSignatureInvalid = 5003,
    /// Webhook payload could not be parsed
    WebhookPayloadInvalid = 5004,

    // ==================== 6xxx: Stock ====================
    /// Stock item not found
    ItemNotFound = 6001,
    /// Conditional deduction did not match a row
    StockDeductionFailed = 6002,
    /// Stock quantity must be positive
    InvalidStockQuantity = 6003,
    /// Catalog has no items
    CatalogEmpty = 6004,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Configuration error
    ConfigError = 9005,
    /// No healthy instance registered for a service
    ServiceUnavailable = 9101,
    /// RPC channel could not reach the peer
    RpcConnectFailed = 9102,
    /// Message broker error
    BrokerError = 9201,
    /// External payment/catalog processor error
    ProcessorError = 9301,
}

impl ErrorCode {
    /// Get the numeric error code
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Get the default message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::RequiredField => "Required field is missing",

            // Order
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::OrderItemsEmpty => "Order must contain at least one item",
            ErrorCode::OrderInvalidQuantity => "Item quantity must be greater than zero",
            ErrorCode::OrderItemIdMissing => "Item id is required",
            ErrorCode::InsufficientStock => "Insufficient stock amount",

            // Payment
            ErrorCode::PaymentLinkFailed => "Failed to create payment link",
            ErrorCode::WebhookSignatureInvalid => "Invalid webhook signature",
            ErrorCode::WebhookPayloadInvalid => "Invalid webhook payload",

            // Stock
            ErrorCode::ItemNotFound => "Item not found",
            ErrorCode::StockDeductionFailed => "Insufficient stock or item not found",
            ErrorCode::InvalidStockQuantity => "Quantity must be greater than zero",
            ErrorCode::CatalogEmpty => "No items in catalog",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::ConfigError => "Configuration error",
            ErrorCode::ServiceUnavailable => "Service unavailable",
            ErrorCode::RpcConnectFailed => "Failed to connect to service",
            ErrorCode::BrokerError => "Message broker error",
            ErrorCode::ProcessorError => "Processor error",
        }
    }
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error returned when converting an unknown u16 to [`ErrorCode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            3 => Ok(ErrorCode::NotFound),
            7 => Ok(ErrorCode::RequiredField),

            // Order
            4001 => Ok(ErrorCode::OrderNotFound),
            4002 => Ok(ErrorCode::OrderItemsEmpty),
            4003 => Ok(ErrorCode::OrderInvalidQuantity),
            4004 => Ok(ErrorCode::OrderItemIdMissing),
            4005 => Ok(ErrorCode::InsufficientStock),

            // Payment
            5002 => Ok(ErrorCode::PaymentLinkFailed),
            5003 => Ok(ErrorCode::WebhookSignatureInvalid),
            5004 => Ok(ErrorCode::WebhookPayloadInvalid),

            // Stock
            6001 => Ok(ErrorCode::ItemNotFound),
            6002 => Ok(ErrorCode::StockDeductionFailed),
            6003 => Ok(ErrorCode::InvalidStockQuantity),
            6004 => Ok(ErrorCode::CatalogEmpty),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9005 => Ok(ErrorCode::ConfigError),
            9101 => Ok(ErrorCode::ServiceUnavailable),
            9102 => Ok(ErrorCode::RpcConnectFailed),
            9201 => Ok(ErrorCode::BrokerError),
            9301 => Ok(ErrorCode::ProcessorError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::Success.code(), 0);
        assert_eq!(ErrorCode::RequiredField.code(), 7);
        assert_eq!(ErrorCode::OrderNotFound.code(), 4001);
        assert_eq!(ErrorCode::InsufficientStock.code(), 4005);
        assert_eq!(ErrorCode::WebhookSignatureInvalid.code(), 5003);
        assert_eq!(ErrorCode::StockDeductionFailed.code(), 6002);
        assert_eq!(ErrorCode::BrokerError.code(), 9201);
    }

    #[test]
    fn test_try_from_covers_every_code() {
        let codes = [
            ErrorCode::Success,
            ErrorCode::Unknown,
            ErrorCode::NotFound,
            ErrorCode::RequiredField,
            ErrorCode::OrderNotFound,
            ErrorCode::OrderItemsEmpty,
            ErrorCode::OrderInvalidQuantity,
            ErrorCode::OrderItemIdMissing,
            ErrorCode::InsufficientStock,
            ErrorCode::PaymentLinkFailed,
            ErrorCode::WebhookSignatureInvalid,
            ErrorCode::WebhookPayloadInvalid,
            ErrorCode::ItemNotFound,
            ErrorCode::StockDeductionFailed,
            ErrorCode::InvalidStockQuantity,
            ErrorCode::CatalogEmpty,
            ErrorCode::InternalError,
            ErrorCode::ConfigError,
            ErrorCode::ServiceUnavailable,
            ErrorCode::RpcConnectFailed,
            ErrorCode::BrokerError,
            ErrorCode::ProcessorError,
        ];

        for code in codes {
            assert_eq!(ErrorCode::try_from(code.code()), Ok(code));
        }
    }

    #[test]
    fn test_try_from_invalid() {
        assert_eq!(ErrorCode::try_from(999), Err(InvalidErrorCode(999)));
        assert_eq!(ErrorCode::try_from(4999), Err(InvalidErrorCode(4999)));
        assert_eq!(ErrorCode::try_from(10000), Err(InvalidErrorCode(10000)));
    }

    #[test]
    fn test_serialize_as_number() {
        let json = serde_json::to_string(&ErrorCode::ItemNotFound).unwrap();
        assert_eq!(json, "6001");

        let code: ErrorCode = serde_json::from_str("4005").unwrap();
        assert_eq!(code, ErrorCode::InsufficientStock);

        let result: Result<ErrorCode, _> = serde_json::from_str("1234");
        assert!(result.is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", ErrorCode::NotFound), "3");
        assert_eq!(format!("{}", ErrorCode::InternalError), "9001");
        assert_eq!(
            format!("{}", InvalidErrorCode(42)),
            "invalid error code: 42"
        );
    }

    #[test]
    fn test_message() {
        assert_eq!(ErrorCode::OrderNotFound.message(), "Order not found");
        assert_eq!(
            ErrorCode::StockDeductionFailed.message(),
            "Insufficient stock or item not found"
        );
        assert_eq!(
            ErrorCode::InsufficientStock.message(),
            "Insufficient stock amount"
        );
    }
}
