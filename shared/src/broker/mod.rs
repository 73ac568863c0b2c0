//! Message broker transport
//!
//! Point-to-point events go to a durable named queue; broadcast events go to a
//! fanout exchange where each consumer binds its own exclusive queue.
//! Consumers acknowledge manually:
//! - `ack` once the side effect is done
//! - `nack(requeue = false)` for payloads that can never be processed
//! - [`handle_retry`] for transient failures (bounded, then dead-lettered)

mod amqp;
mod consumer;
mod memory;
mod retry;

pub use amqp::AmqpBroker;
pub use consumer::{EventProcessor, ProcessResult, dispatch, run_consumer};
pub use memory::{BrokerStats, MemoryBroker};
pub use retry::{RetryError, RetryPolicy, handle_retry, retry_with_backoff};

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::Instrument;

use crate::config::{BrokerConfig, BrokerKind};
use crate::error::AppError;
use crate::telemetry::{TraceHeaders, current_trace_headers};

/// Durable queue consumed by the payment service
pub const ORDER_CREATED_EVENT: &str = "OrderCreatedEvent";
/// Fanout exchange consumed by the stock service (and future subscribers)
pub const ORDER_PAID_EVENT: &str = "OrderPaidEvent";
/// Where messages end up once their retries are exhausted
pub const DEAD_LETTER_QUEUE: &str = "dlq_main";

/// Header carrying how many times a message has been requeued
pub const RETRY_COUNT_HEADER: &str = "x-retry-count";
/// Header recording the final failure of a dead-lettered message
pub const DEATH_REASON_HEADER: &str = "x-death-reason";
/// Requeues allowed before a message is dead-lettered
pub const MAX_RETRY_COUNT: u32 = 3;

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("amqp error: {0}")]
    Amqp(#[from] lapin::Error),

    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("queue {0} already has a consumer")]
    AlreadyConsumed(String),

    #[error("delivery already acknowledged")]
    AlreadySettled,

    #[error("broker is closed")]
    Closed,

    #[error("gave up after {attempts} attempts: {reason}")]
    RetriesExhausted { attempts: u32, reason: String },
}

pub type BrokerResult<T> = Result<T, BrokerError>;

impl From<BrokerError> for AppError {
    fn from(e: BrokerError) -> Self {
        AppError::broker(e.to_string())
    }
}

/// Where a message is published
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Named queue through the default exchange
    Queue(String),
    /// Exchange with an empty routing key (fanout)
    Exchange(String),
}

impl Target {
    pub fn queue(name: impl Into<String>) -> Self {
        Self::Queue(name.into())
    }

    pub fn exchange(name: impl Into<String>) -> Self {
        Self::Exchange(name.into())
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queue(name) => write!(f, "queue:{name}"),
            Self::Exchange(name) => write!(f, "exchange:{name}"),
        }
    }
}

/// Outbound message: persisted body plus string headers
#[derive(Debug, Clone, Default)]
pub struct Message {
    pub body: Vec<u8>,
    pub headers: TraceHeaders,
}

/// Settles one delivery with the broker
#[async_trait]
pub trait Acknowledger: Send + Sync {
    async fn ack(&self) -> BrokerResult<()>;
    async fn nack(&self, requeue: bool) -> BrokerResult<()>;
}

/// A message received from a queue
pub struct Delivery {
    pub queue: String,
    pub body: Vec<u8>,
    pub headers: TraceHeaders,
    acker: Box<dyn Acknowledger>,
}

impl fmt::Debug for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delivery")
            .field("queue", &self.queue)
            .field("body_len", &self.body.len())
            .field("headers", &self.headers)
            .finish()
    }
}

impl Delivery {
    pub fn new(
        queue: impl Into<String>,
        body: Vec<u8>,
        headers: TraceHeaders,
        acker: Box<dyn Acknowledger>,
    ) -> Self {
        Self {
            queue: queue.into(),
            body,
            headers,
            acker,
        }
    }

    /// Requeues already spent on this message
    pub fn retry_count(&self) -> u32 {
        self.headers
            .get(RETRY_COUNT_HEADER)
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }

    /// Decode the JSON body
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    pub async fn ack(&self) -> BrokerResult<()> {
        self.acker.ack().await
    }

    pub async fn nack(&self, requeue: bool) -> BrokerResult<()> {
        self.acker.nack(requeue).await
    }
}

pub type DeliveryStream = BoxStream<'static, BrokerResult<Delivery>>;

#[async_trait]
pub trait Broker: Send + Sync {
    /// Durable, non-autodelete queue for point-to-point events
    async fn declare_queue(&self, name: &str) -> BrokerResult<()>;

    /// Exclusive, autodelete queue bound to a fanout exchange; returns its name
    async fn bind_fanout(&self, exchange: &str) -> BrokerResult<String>;

    /// Publish a persistent message
    async fn publish(&self, target: &Target, message: Message) -> BrokerResult<()>;

    /// Manual-ack subscription to `queue`
    async fn consume(&self, queue: &str) -> BrokerResult<DeliveryStream>;

    /// Graceful shutdown
    async fn close(&self) -> BrokerResult<()>;
}

/// Build the configured broker. Connection failure is returned to the caller (fatal at startup).
pub async fn connect(config: &BrokerConfig) -> BrokerResult<Arc<dyn Broker>> {
    Ok(match config.kind {
        BrokerKind::Memory => Arc::new(MemoryBroker::new()),
        BrokerKind::Amqp => Arc::new(AmqpBroker::connect(config).await?),
    })
}

/// Serialize `payload`, attach the current trace context, and publish with backoff
pub async fn publish_event<T: Serialize>(
    broker: &dyn Broker,
    target: &Target,
    payload: &T,
    policy: &RetryPolicy,
) -> BrokerResult<()> {
    let body = serde_json::to_vec(payload)?;
    let span = tracing::info_span!("amqp.publish", target = %target);

    async move {
        let headers = current_trace_headers();
        retry_with_backoff(policy, || {
            broker.publish(
                target,
                Message {
                    body: body.clone(),
                    headers: headers.clone(),
                },
            )
        })
        .await
        .map_err(|e| BrokerError::RetriesExhausted {
            attempts: e.attempts,
            reason: e.last.to_string(),
        })?;
        tracing::debug!(target = %target, "event published");
        Ok(())
    }
    .instrument(span)
    .await
}
