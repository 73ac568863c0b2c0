//! RabbitMQ broker over lapin

use async_trait::async_trait;
use futures::StreamExt;
use lapin::acker::Acker;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicPublishOptions,
    ConfirmSelectOptions, ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::{AMQPValue, FieldTable, LongString, ShortString};
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind};

use super::{
    Acknowledger, Broker, BrokerResult, DEAD_LETTER_QUEUE, Delivery, DeliveryStream, Message,
    ORDER_PAID_EVENT, Target,
};
use crate::config::BrokerConfig;
use crate::telemetry::TraceHeaders;

/// Persistent delivery mode
const PERSISTENT: u8 = 2;

pub struct AmqpBroker {
    connection: Connection,
    channel: Channel,
}

impl AmqpBroker {
    /// Dial the broker and declare the shared topology
    ///
    /// The paid-event fanout exchange and the dead-letter queue are declared
    /// up front so that any service can publish to them.
    pub async fn connect(config: &BrokerConfig) -> BrokerResult<Self> {
        let connection =
            Connection::connect(&config.uri(), ConnectionProperties::default()).await?;
        let channel = connection.create_channel().await?;
        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await?;

        channel
            .exchange_declare(
                ORDER_PAID_EVENT,
                ExchangeKind::Fanout,
                ExchangeDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;
        channel
            .queue_declare(
                DEAD_LETTER_QUEUE,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;

        tracing::info!(host = %config.host, port = config.port, "connected to message broker");
        Ok(Self {
            connection,
            channel,
        })
    }
}

fn to_field_table(headers: &TraceHeaders) -> FieldTable {
    let mut table = FieldTable::default();
    for (key, value) in headers {
        table.insert(
            ShortString::from(key.clone()),
            AMQPValue::LongString(LongString::from(value.clone())),
        );
    }
    table
}

fn from_field_table(table: Option<&FieldTable>) -> TraceHeaders {
    let mut headers = TraceHeaders::new();
    let Some(table) = table else {
        return headers;
    };
    for (key, value) in table.inner() {
        let value = match value {
            AMQPValue::LongString(s) => String::from_utf8_lossy(s.as_bytes()).into_owned(),
            AMQPValue::ShortString(s) => s.as_str().to_string(),
            AMQPValue::ShortShortInt(n) => n.to_string(),
            AMQPValue::ShortShortUInt(n) => n.to_string(),
            AMQPValue::ShortInt(n) => n.to_string(),
            AMQPValue::ShortUInt(n) => n.to_string(),
            AMQPValue::LongInt(n) => n.to_string(),
            AMQPValue::LongUInt(n) => n.to_string(),
            AMQPValue::LongLongInt(n) => n.to_string(),
            _ => continue,
        };
        headers.insert(key.as_str().to_string(), value);
    }
    headers
}

#[async_trait]
impl Broker for AmqpBroker {
    async fn declare_queue(&self, name: &str) -> BrokerResult<()> {
        self.channel
            .queue_declare(
                name,
                QueueDeclareOptions {
                    durable: true,
                    auto_delete: false,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;
        Ok(())
    }

    async fn bind_fanout(&self, exchange: &str) -> BrokerResult<String> {
        let queue = self
            .channel
            .queue_declare(
                "",
                QueueDeclareOptions {
                    exclusive: true,
                    auto_delete: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;
        let name = queue.name().as_str().to_string();
        self.channel
            .queue_bind(
                &name,
                exchange,
                "",
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await?;
        tracing::debug!(exchange = %exchange, queue = %name, "bound queue to fanout exchange");
        Ok(name)
    }

    async fn publish(&self, target: &Target, message: Message) -> BrokerResult<()> {
        let (exchange, routing_key) = match target {
            Target::Queue(name) => ("", name.as_str()),
            Target::Exchange(name) => (name.as_str(), ""),
        };
        let properties = BasicProperties::default()
            .with_content_type(ShortString::from("application/json"))
            .with_delivery_mode(PERSISTENT)
            .with_headers(to_field_table(&message.headers));

        self.channel
            .basic_publish(
                exchange,
                routing_key,
                BasicPublishOptions::default(),
                &message.body,
                properties,
            )
            .await?
            .await?;
        Ok(())
    }

    async fn consume(&self, queue: &str) -> BrokerResult<DeliveryStream> {
        let tag = format!("{}-{}", queue, uuid::Uuid::new_v4());
        let consumer = self
            .channel
            .basic_consume(
                queue,
                &tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;

        let queue = queue.to_string();
        let stream = consumer.map(move |result| {
            let delivery = result?;
            let headers = from_field_table(delivery.properties.headers().as_ref());
            Ok(Delivery::new(
                queue.clone(),
                delivery.data,
                headers,
                Box::new(AmqpAcker(delivery.acker)),
            ))
        });
        Ok(stream.boxed())
    }

    async fn close(&self) -> BrokerResult<()> {
        self.channel.close(200, "OK").await?;
        self.connection.close(200, "OK").await?;
        tracing::info!("message broker connection closed");
        Ok(())
    }
}

struct AmqpAcker(Acker);

#[async_trait]
impl Acknowledger for AmqpAcker {
    async fn ack(&self) -> BrokerResult<()> {
        self.0.ack(BasicAckOptions::default()).await?;
        Ok(())
    }

    async fn nack(&self, requeue: bool) -> BrokerResult<()> {
        self.0
            .nack(BasicNackOptions {
                multiple: false,
                requeue,
            })
            .await?;
        Ok(())
    }
}
