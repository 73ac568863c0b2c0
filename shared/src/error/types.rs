//! Error types and API response structures

use super::codes::ErrorCode;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Application error with structured error code and details
///
/// The same value is produced by the service that failed, carried across the
/// RPC boundary inside an [`ApiResponse`], and rebuilt on the calling side, so
/// callers can branch on [`ErrorCode`] instead of parsing messages.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AppError {
    /// The error code identifying the type of error
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details (field-level errors, context, etc.)
    pub details: Option<HashMap<String, Value>>,
}

impl AppError {
    /// Create a new error with the default message for the error code
    pub fn new(code: ErrorCode) -> Self {
        Self {
            message: code.message().to_string(),
            code,
            details: None,
        }
    }

    /// Create a new error with a custom message
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Add a detail entry to this error
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Get the HTTP status code for this error
    pub fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }

    /// True for codes the caller can branch on without treating as an outage
    pub fn is_not_found(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::NotFound | ErrorCode::OrderNotFound | ErrorCode::ItemNotFound
        )
    }

    // ==================== Convenience constructors ====================

    /// Create a not found error
    pub fn not_found(resource: impl Into<String>) -> Self {
        let r = resource.into();
        Self::with_message(ErrorCode::NotFound, format!("{} not found", r))
            .with_detail("resource", r)
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InternalError, msg)
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::ConfigError, msg)
    }

    /// Create an order not found error
    pub fn order_not_found(order_id: impl Into<String>) -> Self {
        Self::new(ErrorCode::OrderNotFound).with_detail("order_id", order_id.into())
    }

    /// Create an item not found error
    pub fn item_not_found(item_id: impl Into<String>) -> Self {
        Self::new(ErrorCode::ItemNotFound).with_detail("item_id", item_id.into())
    }

    /// Create an insufficient stock error
    pub fn insufficient_stock() -> Self {
        Self::new(ErrorCode::InsufficientStock)
    }

    /// Create an external processor error
    pub fn processor(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::ProcessorError, msg)
    }

    /// Create a message broker error
    pub fn broker(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::BrokerError, msg)
    }

    /// Create a service unavailable error (no healthy instance)
    pub fn service_unavailable(service: impl Into<String>) -> Self {
        let s = service.into();
        Self::with_message(
            ErrorCode::ServiceUnavailable,
            format!("no healthy instance of {}", s),
        )
        .with_detail("service", s)
    }

    /// Create an RPC connection error
    pub fn rpc_connect(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::RpcConnectFailed, msg)
    }
}

/// Unified API response structure
///
/// Provides a consistent response format for all API and RPC endpoints:
/// - `code`: Error code (0 for success)
/// - `message`: Human-readable message
/// - `data`: Response payload (on success)
/// - `details`: Additional error details (on failure)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Error code (0 for success, non-zero for errors)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
    /// Human-readable message
    pub message: String,
    /// Response data (present on success)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Additional error details (present on failure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, Value>>,
}

impl<T> ApiResponse<T> {
    /// Create a success response with data
    pub fn success(data: T) -> Self {
        Self {
            code: Some(0),
            message: "OK".to_string(),
            data: Some(data),
            details: None,
        }
    }

    /// Whether this envelope reports success
    pub fn is_success(&self) -> bool {
        matches!(self.code, None | Some(0))
    }

    /// Convert the envelope back into a result
    ///
    /// Unknown codes from a newer peer degrade to [`ErrorCode::Unknown`].
    pub fn into_result(self) -> Result<Option<T>, AppError> {
        if self.is_success() {
            return Ok(self.data);
        }
        let code = self
            .code
            .and_then(|c| ErrorCode::try_from(c).ok())
            .unwrap_or(ErrorCode::Unknown);
        Err(AppError {
            code,
            message: self.message,
            details: self.details,
        })
    }
}

impl ApiResponse<()> {
    /// Create a success response without data
    pub fn ok() -> Self {
        Self {
            code: Some(0),
            message: "OK".to_string(),
            data: None,
            details: None,
        }
    }

    /// Create an error response from an AppError
    pub fn error(err: &AppError) -> Self {
        Self {
            code: Some(err.code.code()),
            message: err.message.clone(),
            data: None,
            details: err.details.clone(),
        }
    }
}

impl<T> From<AppError> for ApiResponse<T> {
    fn from(err: AppError) -> Self {
        Self {
            code: Some(err.code.code()),
            message: err.message,
            data: None,
            details: err.details,
        }
    }
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

// ===== Axum Integration =====

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::Json;

        let status = self.http_status();
        let body = ApiResponse::<()>::error(&self);

        // Log system errors
        if matches!(self.code.category(), super::category::ErrorCategory::System) {
            tracing::error!(
                code = %self.code,
                message = %self.message,
                "System error occurred"
            );
        }

        (status, Json(body)).into_response()
    }
}

impl<T: Serialize> axum::response::IntoResponse for ApiResponse<T> {
    fn into_response(self) -> axum::response::Response {
        use axum::Json;

        let status = match self.code {
            None | Some(0) => StatusCode::OK,
            Some(code) => ErrorCode::try_from(code)
                .map(|c| c.http_status())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        };

        (status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_new() {
        let err = AppError::new(ErrorCode::OrderNotFound);
        assert_eq!(err.code, ErrorCode::OrderNotFound);
        assert_eq!(err.message, "Order not found");
        assert!(err.details.is_none());
    }

    #[test]
    fn test_app_error_with_detail() {
        let err = AppError::with_message(ErrorCode::RequiredField, "Missing required fields")
            .with_detail("field", "customerID")
            .with_detail("reason", "required");

        assert_eq!(err.code, ErrorCode::RequiredField);
        let details = err.details.unwrap();
        assert_eq!(details.get("field").unwrap(), "customerID");
        assert_eq!(details.get("reason").unwrap(), "required");
    }

    #[test]
    fn test_app_error_convenience_constructors() {
        let err = AppError::not_found("Stock item");
        assert_eq!(err.code, ErrorCode::NotFound);
        assert_eq!(err.message, "Stock item not found");

        let err = AppError::order_not_found("o-1");
        assert!(err.is_not_found());
        assert_eq!(err.details.unwrap().get("order_id").unwrap(), "o-1");

        let err = AppError::service_unavailable("stocks");
        assert_eq!(err.code, ErrorCode::ServiceUnavailable);
        assert_eq!(err.message, "no healthy instance of stocks");

        assert!(!AppError::internal("boom").is_not_found());
    }

    #[test]
    fn test_api_response_success() {
        let resp = ApiResponse::success(vec![1, 2]);
        assert!(resp.is_success());
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["code"], 0);
        assert_eq!(json["data"], serde_json::json!([1, 2]));
        assert!(json.get("details").is_none());
    }

    #[test]
    fn test_api_response_error_roundtrip() {
        let err = AppError::item_not_found("item-9");
        let resp: ApiResponse<String> = err.into();
        let json = serde_json::to_string(&resp).unwrap();

        let parsed: ApiResponse<String> = serde_json::from_str(&json).unwrap();
        let back = parsed.into_result().unwrap_err();
        assert_eq!(back.code, ErrorCode::ItemNotFound);
        assert_eq!(back.message, "Item not found");
        assert_eq!(back.details.unwrap().get("item_id").unwrap(), "item-9");
    }

    #[test]
    fn test_api_response_unknown_code() {
        let resp: ApiResponse<()> = ApiResponse {
            code: Some(4999),
            message: "from the future".into(),
            data: None,
            details: None,
        };
        let err = resp.into_result().unwrap_err();
        assert_eq!(err.code, ErrorCode::Unknown);
        assert_eq!(err.message, "from the future");
    }

    #[test]
    fn test_into_response_status() {
        use axum::response::IntoResponse;

        let resp = AppError::insufficient_stock().into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let resp = ApiResponse::success("ok").into_response();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
