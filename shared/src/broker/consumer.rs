//! Consumer loop: process each delivery and settle it exactly once

use async_trait::async_trait;
use futures::StreamExt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::{Broker, Delivery, DeliveryStream, RetryPolicy, handle_retry};
use crate::telemetry::set_parent_from;

/// Outcome of processing one delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessResult {
    /// Side effect done, acknowledge
    Success { message: String },
    /// Nothing to do (e.g. an order not yet paid), acknowledge
    Skipped { reason: String },
    /// Transient failure, requeue with backoff
    Retry { reason: String },
    /// Can never succeed (malformed payload), discard without requeue
    Failed { reason: String },
}

impl ProcessResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ProcessResult::Success { .. })
    }

    pub fn should_retry(&self) -> bool {
        matches!(self, ProcessResult::Retry { .. })
    }
}

/// Business handler for one queue
#[async_trait]
pub trait EventProcessor: Send + Sync {
    /// Used in logs
    fn name(&self) -> &'static str;

    async fn process(&self, delivery: &Delivery) -> ProcessResult;
}

/// Consume `deliveries` until the stream ends or `shutdown` fires
///
/// Each delivery is handled on its own task so one slow message does not
/// hold up the queue.
pub async fn run_consumer(
    broker: Arc<dyn Broker>,
    mut deliveries: DeliveryStream,
    processor: Arc<dyn EventProcessor>,
    policy: RetryPolicy,
    shutdown: CancellationToken,
) {
    tracing::info!(consumer = processor.name(), "consumer started");

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!(consumer = processor.name(), "consumer shutting down");
                break;
            }
            next = deliveries.next() => {
                match next {
                    Some(Ok(delivery)) => {
                        let broker = broker.clone();
                        let processor = processor.clone();
                        tokio::spawn(async move {
                            dispatch(broker.as_ref(), processor.as_ref(), delivery, &policy).await;
                        });
                    }
                    Some(Err(e)) => {
                        tracing::error!(consumer = processor.name(), error = %e, "failed to receive delivery");
                    }
                    None => {
                        tracing::info!(consumer = processor.name(), "delivery stream closed");
                        break;
                    }
                }
            }
        }
    }

    tracing::info!(consumer = processor.name(), "consumer stopped");
}

/// Process one delivery inside a span parented on the publisher's trace, then settle it
pub async fn dispatch(
    broker: &dyn Broker,
    processor: &dyn EventProcessor,
    delivery: Delivery,
    policy: &RetryPolicy,
) {
    let span = tracing::info_span!(
        "amqp.consume",
        consumer = processor.name(),
        queue = %delivery.queue,
        retry_count = delivery.retry_count(),
    );
    set_parent_from(&span, &delivery.headers);

    async {
        let result = processor.process(&delivery).await;
        let settled = match &result {
            ProcessResult::Success { message } => {
                tracing::info!(result = %message, "message processed successfully");
                delivery.ack().await
            }
            ProcessResult::Skipped { reason } => {
                tracing::info!(reason = %reason, "message skipped");
                delivery.ack().await
            }
            ProcessResult::Failed { reason } => {
                tracing::error!(reason = %reason, "message processing failed permanently");
                delivery.nack(false).await
            }
            ProcessResult::Retry { reason } => handle_retry(broker, &delivery, reason, policy)
                .await
                .map(|_| ()),
        };
        if let Err(e) = settled {
            tracing::error!(error = %e, "failed to settle delivery");
        }
    }
    .instrument(span)
    .await
}
