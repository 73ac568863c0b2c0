//! In-process broker used by tests and single-machine runs
//!
//! Same contract as the AMQP broker: queues are auto-created on first use,
//! fanout exchanges copy each message into every bound queue, and a delivery
//! nacked with `requeue = true` goes back to its queue.

use async_trait::async_trait;
use dashmap::DashMap;
use futures::StreamExt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::mpsc;

use super::{
    Acknowledger, Broker, BrokerError, BrokerResult, Delivery, DeliveryStream, Message, Target,
};

/// Counters for assertions in tests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BrokerStats {
    pub published: u64,
    pub acked: u64,
    pub nacked: u64,
}

struct QueueSlot {
    tx: mpsc::UnboundedSender<Message>,
    rx: Option<mpsc::UnboundedReceiver<Message>>,
}

impl QueueSlot {
    fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx: Some(rx) }
    }
}

#[derive(Default)]
struct Inner {
    queues: DashMap<String, QueueSlot>,
    exchanges: DashMap<String, Vec<String>>,
    published: AtomicU64,
    acked: AtomicU64,
    nacked: AtomicU64,
    closed: AtomicBool,
}

impl Inner {
    fn enqueue(&self, queue: &str, message: Message) -> BrokerResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(BrokerError::Closed);
        }
        let tx = self
            .queues
            .entry(queue.to_string())
            .or_insert_with(QueueSlot::new)
            .tx
            .clone();
        tx.send(message).map_err(|_| BrokerError::Closed)
    }
}

#[derive(Clone, Default)]
pub struct MemoryBroker {
    inner: Arc<Inner>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> BrokerStats {
        BrokerStats {
            published: self.inner.published.load(Ordering::Relaxed),
            acked: self.inner.acked.load(Ordering::Relaxed),
            nacked: self.inner.nacked.load(Ordering::Relaxed),
        }
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn declare_queue(&self, name: &str) -> BrokerResult<()> {
        self.inner
            .queues
            .entry(name.to_string())
            .or_insert_with(QueueSlot::new);
        Ok(())
    }

    async fn bind_fanout(&self, exchange: &str) -> BrokerResult<String> {
        let queue = format!("{}.{}", exchange, uuid::Uuid::new_v4());
        self.declare_queue(&queue).await?;
        self.inner
            .exchanges
            .entry(exchange.to_string())
            .or_default()
            .push(queue.clone());
        Ok(queue)
    }

    async fn publish(&self, target: &Target, message: Message) -> BrokerResult<()> {
        match target {
            Target::Queue(name) => self.inner.enqueue(name, message)?,
            Target::Exchange(name) => {
                if self.inner.closed.load(Ordering::Acquire) {
                    return Err(BrokerError::Closed);
                }
                let bound = self
                    .inner
                    .exchanges
                    .get(name)
                    .map(|queues| queues.clone())
                    .unwrap_or_default();
                if bound.is_empty() {
                    tracing::debug!(exchange = %name, "no queue bound, message dropped");
                }
                for queue in bound {
                    self.inner.enqueue(&queue, message.clone())?;
                }
            }
        }
        self.inner.published.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn consume(&self, queue: &str) -> BrokerResult<DeliveryStream> {
        let rx = self
            .inner
            .queues
            .entry(queue.to_string())
            .or_insert_with(QueueSlot::new)
            .rx
            .take()
            .ok_or_else(|| BrokerError::AlreadyConsumed(queue.to_string()))?;

        let state = (rx, self.inner.clone(), queue.to_string());
        let stream = futures::stream::unfold(state, |(mut rx, inner, queue)| async move {
            let message = rx.recv().await?;
            let acker = MemoryAcker {
                inner: inner.clone(),
                queue: queue.clone(),
                message: message.clone(),
                settled: AtomicBool::new(false),
            };
            let delivery = Delivery::new(
                queue.clone(),
                message.body,
                message.headers,
                Box::new(acker),
            );
            Some((Ok(delivery), (rx, inner, queue)))
        });
        Ok(stream.boxed())
    }

    async fn close(&self) -> BrokerResult<()> {
        self.inner.closed.store(true, Ordering::Release);
        // Dropping the senders ends every open consumer stream
        self.inner.queues.clear();
        self.inner.exchanges.clear();
        Ok(())
    }
}

struct MemoryAcker {
    inner: Arc<Inner>,
    queue: String,
    message: Message,
    settled: AtomicBool,
}

impl MemoryAcker {
    fn settle(&self) -> BrokerResult<()> {
        if self.settled.swap(true, Ordering::AcqRel) {
            return Err(BrokerError::AlreadySettled);
        }
        Ok(())
    }
}

#[async_trait]
impl Acknowledger for MemoryAcker {
    async fn ack(&self) -> BrokerResult<()> {
        self.settle()?;
        self.inner.acked.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn nack(&self, requeue: bool) -> BrokerResult<()> {
        self.settle()?;
        self.inner.nacked.fetch_add(1, Ordering::Relaxed);
        if requeue {
            self.inner.enqueue(&self.queue, self.message.clone())?;
        }
        Ok(())
    }
}
