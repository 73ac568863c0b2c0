//! Stripe webhook
//!
//! POST /webhook. The raw body is needed for HMAC verification, so it is
//! read as bytes and parsed only after the signature checks out.

use axum::Router;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

use shared::broker::{Broker, ORDER_PAID_EVENT, RetryPolicy, Target, publish_event};
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::Order;

/// Largest accepted webhook body
pub const MAX_BODY_BYTES: usize = 65536;
/// Accepted clock skew between Stripe and us
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;
const PUBLISH_TIMEOUT: Duration = Duration::from_secs(5);

/// Event types we acknowledge without acting on
const INFORMATIONAL_EVENTS: &[&str] = &[
    "payment_intent.succeeded",
    "payment_intent.payment_failed",
    "payment_intent.created",
    "mandate.updated",
    "charge.succeeded",
    "charge.updated",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("invalid Stripe-Signature header")]
    MalformedHeader,
    #[error("invalid signing key")]
    Key,
    #[error("invalid signature encoding")]
    Encoding,
    #[error("webhook signature mismatch")]
    Mismatch,
    #[error("invalid timestamp")]
    Timestamp,
    #[error("webhook timestamp outside tolerance")]
    Expired,
}

/// Verify a `Stripe-Signature` header (`t=<unix>,v1=<hex hmac>`) against `payload`
pub fn verify_webhook_signature(
    payload: &[u8],
    sig_header: &str,
    secret: &str,
) -> Result<(), SignatureError> {
    verify_at(payload, sig_header, secret, chrono::Utc::now().timestamp())
}

fn verify_at(
    payload: &[u8],
    sig_header: &str,
    secret: &str,
    now: i64,
) -> Result<(), SignatureError> {
    let mut timestamp = "";
    let mut signatures = Vec::new();
    for part in sig_header.split(',') {
        let part = part.trim();
        if let Some(t) = part.strip_prefix("t=") {
            timestamp = t;
        } else if let Some(v) = part.strip_prefix("v1=") {
            signatures.push(v);
        }
    }
    if timestamp.is_empty() || signatures.is_empty() {
        return Err(SignatureError::MalformedHeader);
    }

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|_| SignatureError::Key)?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);

    // Stripe sends one v1 entry per active secret during rotation
    let mut last = SignatureError::Mismatch;
    let matched = signatures.iter().any(|signature| {
        let Ok(bytes) = hex::decode(signature) else {
            last = SignatureError::Encoding;
            return false;
        };
        mac.clone().verify_slice(&bytes).is_ok()
    });
    if !matched {
        return Err(last);
    }

    let ts: i64 = timestamp.parse().map_err(|_| SignatureError::Timestamp)?;
    if (now - ts).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(SignatureError::Expired);
    }
    Ok(())
}

/// Build a `Stripe-Signature` header value for `payload`
pub fn signature_header(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac = match Hmac::<Sha256>::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return format!("t={timestamp}"),
    };
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    format!(
        "t={timestamp},v1={}",
        hex::encode(mac.finalize().into_bytes())
    )
}

#[derive(Debug, Deserialize)]
struct WebhookEvent {
    #[serde(rename = "type")]
    event_type: String,
    data: EventData,
}

#[derive(Debug, Deserialize)]
struct EventData {
    object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct CheckoutSession {
    #[serde(default)]
    id: String,
    #[serde(default)]
    payment_status: String,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

#[derive(Clone)]
pub struct WebhookState {
    pub broker: Arc<dyn Broker>,
    pub endpoint_secret: Arc<str>,
    pub publish_policy: RetryPolicy,
}

impl WebhookState {
    pub fn new(broker: Arc<dyn Broker>, endpoint_secret: impl Into<Arc<str>>) -> Self {
        Self {
            broker,
            endpoint_secret: endpoint_secret.into(),
            publish_policy: RetryPolicy::default(),
        }
    }
}

pub fn webhook_router(state: WebhookState) -> Router {
    Router::new()
        .route("/webhook", post(handle_webhook))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Handle one Stripe event
///
/// Non-2xx makes Stripe redeliver, so only a failed `OrderPaid` publish
/// answers 500; unknown event types are acknowledged.
pub async fn handle_webhook(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<StatusCode> {
    let Some(sig_header) = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
    else {
        tracing::warn!("missing Stripe-Signature header");
        return Err(AppError::with_message(
            ErrorCode::WebhookSignatureInvalid,
            "missing Stripe-Signature header",
        ));
    };

    if let Err(e) = verify_webhook_signature(&body, sig_header, &state.endpoint_secret) {
        tracing::warn!(error = %e, "webhook signature verification failed");
        return Err(AppError::with_message(
            ErrorCode::WebhookSignatureInvalid,
            e.to_string(),
        ));
    }

    let event: WebhookEvent = serde_json::from_slice(&body).map_err(|e| {
        tracing::warn!(error = %e, "failed to parse webhook event");
        AppError::new(ErrorCode::WebhookPayloadInvalid)
    })?;

    match event.event_type.as_str() {
        "checkout.session.completed" => checkout_completed(&state, event.data.object).await,
        known if INFORMATIONAL_EVENTS.contains(&known) => {
            tracing::debug!(event_type = known, "webhook event acknowledged");
            Ok(StatusCode::OK)
        }
        other => {
            tracing::info!(event_type = other, "unhandled webhook event type");
            Ok(StatusCode::OK)
        }
    }
}

async fn checkout_completed(
    state: &WebhookState,
    object: serde_json::Value,
) -> AppResult<StatusCode> {
    let session: CheckoutSession = serde_json::from_value(object).map_err(|e| {
        tracing::warn!(error = %e, "failed to parse checkout session");
        AppError::new(ErrorCode::WebhookPayloadInvalid)
    })?;
    if session.payment_status != "paid" {
        tracing::info!(
            session_id = %session.id,
            payment_status = %session.payment_status,
            "checkout completed without payment"
        );
        return Ok(StatusCode::OK);
    }

    let (Some(order_id), Some(customer_id)) = (
        session.metadata.get("orderID").filter(|v| !v.is_empty()),
        session.metadata.get("customerID").filter(|v| !v.is_empty()),
    ) else {
        tracing::warn!(session_id = %session.id, "paid checkout session without order metadata");
        return Ok(StatusCode::OK);
    };
    tracing::info!(session_id = %session.id, order_id = %order_id, "payment succeeded");

    let order = Order::paid(order_id.as_str(), customer_id.as_str());
    let target = Target::exchange(ORDER_PAID_EVENT);
    let publish = publish_event(
        state.broker.as_ref(),
        &target,
        &order,
        &state.publish_policy,
    );
    match tokio::time::timeout(PUBLISH_TIMEOUT, publish).await {
        Ok(Ok(())) => Ok(StatusCode::OK),
        Ok(Err(e)) => {
            tracing::error!(order_id = %order.id, error = %e, "failed to publish order paid");
            Err(AppError::from(e).with_detail("order_id", order.id.clone()))
        }
        Err(_) => {
            tracing::error!(order_id = %order.id, "timed out publishing order paid");
            Err(AppError::broker("timed out publishing order paid")
                .with_detail("order_id", order.id.clone()))
        }
    }
}
