//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Success => StatusCode::OK,

            // 404 Not Found
            Self::NotFound | Self::OrderNotFound | Self::ItemNotFound | Self::CatalogEmpty => {
                StatusCode::NOT_FOUND
            }

            // 409 Conflict: caller must not retry blindly
            Self::InsufficientStock | Self::StockDeductionFailed => StatusCode::CONFLICT,

            // 502 Bad Gateway (external processor misbehaved)
            Self::ProcessorError | Self::PaymentLinkFailed => StatusCode::BAD_GATEWAY,

            // 503 Service Unavailable (transient, client can retry)
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,

            // 500 Internal Server Error
            Self::Unknown
            | Self::InternalError
            | Self::ConfigError
            | Self::RpcConnectFailed
            | Self::BrokerError => StatusCode::INTERNAL_SERVER_ERROR,

            // 400 Bad Request (validation and malformed input)
            Self::RequiredField
            | Self::OrderItemsEmpty
            | Self::OrderInvalidQuantity
            | Self::OrderItemIdMissing
            | Self::InvalidStockQuantity
            | Self::WebhookSignatureInvalid
            | Self::WebhookPayloadInvalid => StatusCode::BAD_REQUEST,
        }
    }
}
