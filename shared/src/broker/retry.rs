//! Bounded retry with exponential backoff

use std::fmt;
use std::future::Future;
use std::time::Duration;

use super::{
    Broker, BrokerError, BrokerResult, DEAD_LETTER_QUEUE, DEATH_REASON_HEADER, Delivery,
    MAX_RETRY_COUNT, Message, RETRY_COUNT_HEADER, Target,
};

/// Attempt bound and backoff base: delay before attempt `n + 1` is `base * 2^(n-1)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Delay after the `attempt`-th failure (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * 2_u32.saturating_pow(attempt.saturating_sub(1))
    }
}

/// Returned once every attempt failed
#[derive(Debug)]
pub struct RetryError<E> {
    pub attempts: u32,
    pub last: E,
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "operation failed after {} attempts: {}",
            self.attempts, self.last
        )
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for RetryError<E> {}

/// Run `op` until it succeeds or `policy.max_attempts` is reached
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: &RetryPolicy,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= max_attempts => {
                return Err(RetryError {
                    attempts: attempt,
                    last: e,
                });
            }
            Err(e) => {
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "operation failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Requeue a transiently failed delivery, or dead-letter it once exhausted
///
/// The copy is published before the original is acknowledged, so a crash in
/// between produces a duplicate rather than a loss. Returns the new retry count.
pub async fn handle_retry(
    broker: &dyn Broker,
    delivery: &Delivery,
    reason: &str,
    policy: &RetryPolicy,
) -> BrokerResult<u32> {
    let retry_count = delivery.retry_count();
    let mut headers = delivery.headers.clone();

    if retry_count >= MAX_RETRY_COUNT {
        tracing::error!(
            queue = %delivery.queue,
            retry_count,
            reason = %reason,
            "max retries exceeded, sending to dead letter queue"
        );
        headers.insert(DEATH_REASON_HEADER.to_string(), reason.to_string());
        broker
            .publish(
                &Target::queue(DEAD_LETTER_QUEUE),
                Message {
                    body: delivery.body.clone(),
                    headers,
                },
            )
            .await?;
        delivery.ack().await?;
        return Err(BrokerError::RetriesExhausted {
            attempts: retry_count + 1,
            reason: reason.to_string(),
        });
    }

    let next = retry_count + 1;
    let delay = policy.delay_for(next);
    tracing::warn!(
        queue = %delivery.queue,
        retry_count = next,
        delay_ms = delay.as_millis() as u64,
        reason = %reason,
        "requeueing message"
    );
    tokio::time::sleep(delay).await;

    headers.insert(RETRY_COUNT_HEADER.to_string(), next.to_string());
    broker
        .publish(
            &Target::queue(delivery.queue.clone()),
            Message {
                body: delivery.body.clone(),
                headers,
            },
        )
        .await?;
    delivery.ack().await?;
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::MemoryBroker;
    use futures::StreamExt;
    use std::sync::atomic::{AtomicU32, Ordering};

    const FAST: RetryPolicy = RetryPolicy::new(3, Duration::from_millis(1));

    #[test]
    fn test_delay_grows_exponentially() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result: Result<&str, RetryError<String>> = retry_with_backoff(&FAST, || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err("flaky".to_string())
            } else {
                Ok("done")
            }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_reports_attempts_and_last_error() {
        let calls = AtomicU32::new(0);
        let err = retry_with_backoff(&FAST, || async {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            Err::<(), _>(format!("failure {n}"))
        })
        .await
        .unwrap_err();

        assert_eq!(err.attempts, 3);
        assert_eq!(err.last, "failure 3");
        assert_eq!(
            err.to_string(),
            "operation failed after 3 attempts: failure 3"
        );
    }

    #[tokio::test]
    async fn test_handle_retry_requeues_with_incremented_count() {
        let broker = MemoryBroker::new();
        broker.declare_queue("work").await.unwrap();
        let mut deliveries = broker.consume("work").await.unwrap();

        broker
            .publish(&Target::queue("work"), Message {
                body: b"payload".to_vec(),
                ..Default::default()
            })
            .await
            .unwrap();

        let first = deliveries.next().await.unwrap().unwrap();
        assert_eq!(handle_retry(&broker, &first, "db down", &FAST).await.unwrap(), 1);

        let second = deliveries.next().await.unwrap().unwrap();
        assert_eq!(second.retry_count(), 1);
        assert_eq!(second.body, b"payload");
        second.ack().await.unwrap();

        // Original was acknowledged, not left pending
        assert_eq!(broker.stats().acked, 2);
    }

    #[tokio::test]
    async fn test_handle_retry_dead_letters_when_exhausted() {
        let broker = MemoryBroker::new();
        broker.declare_queue("work").await.unwrap();
        let mut deliveries = broker.consume("work").await.unwrap();
        let mut dead = broker.consume(DEAD_LETTER_QUEUE).await.unwrap();

        let mut headers = crate::telemetry::TraceHeaders::new();
        headers.insert(RETRY_COUNT_HEADER.into(), MAX_RETRY_COUNT.to_string());
        broker
            .publish(&Target::queue("work"), Message {
                body: b"poison-ish".to_vec(),
                headers,
            })
            .await
            .unwrap();

        let delivery = deliveries.next().await.unwrap().unwrap();
        let err = handle_retry(&broker, &delivery, "still failing", &FAST)
            .await
            .unwrap_err();
        assert!(matches!(err, BrokerError::RetriesExhausted { attempts: 4, .. }));

        let dead_letter = dead.next().await.unwrap().unwrap();
        assert_eq!(dead_letter.body, b"poison-ish");
        assert_eq!(
            dead_letter.headers.get(DEATH_REASON_HEADER).map(String::as_str),
            Some("still failing")
        );
    }
}
