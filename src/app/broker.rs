use async_trait::async_trait;
use futures::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicPublishOptions, BasicRejectOptions,
    QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, Consumer};

use crate::config::{AckMode, BrokerConfig};
use crate::error::{AppError, Context, Result};

const CONSUMER_TAG: &str = "candle-worker";
const CONTENT_TYPE_JSON: &str = "application/json";

/// One inbound job message.
#[derive(Debug, Clone)]
pub struct JobDelivery {
    pub delivery_tag: u64,
    pub payload: Vec<u8>,
}

/// Where job messages come from.
#[async_trait]
pub trait JobSource: Send {
    /// Next delivery, or `None` once the source is exhausted.
    async fn recv(&mut self) -> Option<Result<JobDelivery>>;
    async fn ack(&mut self, delivery: &JobDelivery) -> Result<()>;
    /// Drop the delivery without requeueing it.
    async fn reject(&mut self, delivery: &JobDelivery) -> Result<()>;
}

/// Where serialized candles go.
#[async_trait]
pub trait CandleSink: Send {
    async fn publish(&mut self, payload: &[u8]) -> Result<()>;
}

/// AMQP connection with the jobs and data queues declared.
pub struct AmqpBroker {
    connection: Connection,
    channel: Channel,
    config: BrokerConfig,
}

impl AmqpBroker {
    pub async fn connect(config: &BrokerConfig) -> Result<Self> {
        let connection = Connection::connect(&config.uri, ConnectionProperties::default())
            .await
            .context("Failed to connect to the message broker")?;
        let channel = connection
            .create_channel()
            .await
            .context("Failed to open a broker channel")?;

        for queue in [&config.jobs_queue, &config.data_queue] {
            channel
                .queue_declare(queue, QueueDeclareOptions::default(), FieldTable::default())
                .await
                .with_context(|| format!("Failed to declare queue {}", queue))?;
        }

        Ok(Self {
            connection,
            channel,
            config: config.clone(),
        })
    }

    pub async fn job_source(&self, ack_mode: AckMode) -> Result<AmqpJobSource> {
        let options = BasicConsumeOptions {
            no_ack: ack_mode == AckMode::Auto,
            ..BasicConsumeOptions::default()
        };
        let consumer = self
            .channel
            .basic_consume(
                &self.config.jobs_queue,
                CONSUMER_TAG,
                options,
                FieldTable::default(),
            )
            .await
            .with_context(|| format!("Failed to consume from {}", self.config.jobs_queue))?;

        Ok(AmqpJobSource {
            channel: self.channel.clone(),
            consumer,
            ack_mode,
        })
    }

    pub fn candle_sink(&self) -> AmqpCandleSink {
        AmqpCandleSink {
            channel: self.channel.clone(),
            queue: self.config.data_queue.clone(),
        }
    }

    pub async fn close(self) -> Result<()> {
        self.channel.close(200, "worker stopped").await?;
        self.connection.close(200, "worker stopped").await?;
        Ok(())
    }
}

pub struct AmqpJobSource {
    channel: Channel,
    consumer: Consumer,
    ack_mode: AckMode,
}

#[async_trait]
impl JobSource for AmqpJobSource {
    async fn recv(&mut self) -> Option<Result<JobDelivery>> {
        let delivery = self.consumer.next().await?;
        Some(
            delivery
                .map(|delivery| JobDelivery {
                    delivery_tag: delivery.delivery_tag,
                    payload: delivery.data,
                })
                .map_err(AppError::from),
        )
    }

    async fn ack(&mut self, delivery: &JobDelivery) -> Result<()> {
        if self.ack_mode == AckMode::Auto {
            return Ok(());
        }
        self.channel
            .basic_ack(delivery.delivery_tag, BasicAckOptions::default())
            .await?;
        Ok(())
    }

    async fn reject(&mut self, delivery: &JobDelivery) -> Result<()> {
        if self.ack_mode == AckMode::Auto {
            return Ok(());
        }
        self.channel
            .basic_reject(
                delivery.delivery_tag,
                BasicRejectOptions { requeue: false },
            )
            .await?;
        Ok(())
    }
}

pub struct AmqpCandleSink {
    channel: Channel,
    queue: String,
}

#[async_trait]
impl CandleSink for AmqpCandleSink {
    async fn publish(&mut self, payload: &[u8]) -> Result<()> {
        let properties = BasicProperties::default().with_content_type(CONTENT_TYPE_JSON.into());
        self.channel
            .basic_publish(
                "",
                &self.queue,
                BasicPublishOptions::default(),
                payload,
                properties,
            )
            .await
            .map_err(|err| AppError::publish(format!("send to {} failed: {err}", self.queue)))?
            .await
            .map_err(|err| AppError::publish(format!("confirm from {} failed: {err}", self.queue)))?;
        Ok(())
    }
}
