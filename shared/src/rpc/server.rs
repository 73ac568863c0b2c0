//! Server-side helpers shared by every service's RPC router

use axum::Json;
use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use tracing::Instrument;
use tracing_opentelemetry::OpenTelemetrySpanExt as _;

use crate::error::{ApiResponse, AppError};
use crate::telemetry::extract_http_context;

/// Result type of an RPC handler
pub type RpcResult<T> = Result<Json<ApiResponse<T>>, AppError>;

/// Wrap a successful payload
pub fn reply<T>(data: T) -> RpcResult<T> {
    Ok(Json(ApiResponse::success(data)))
}

/// Middleware: run each request inside a span parented on the caller's trace
pub async fn propagate_trace(request: Request, next: Next) -> Response {
    let span = tracing::info_span!(
        "rpc.request",
        method = %request.method(),
        path = %request.uri().path(),
    );
    if let Some(parent) = extract_http_context(request.headers())
        && let Err(e) = span.set_parent(parent)
    {
        tracing::warn!(error = %e, "failed to set parent context on rpc span");
    }

    next.run(request).instrument(span).await
}
