//! Redis pub/sub bridge.
//!
//! [`RedisPubSub`] publishes [`BrokerEvent`]s on the project's Redis channels
//! and runs a listener that forwards every message it receives onto an
//! [`EventBus`], reconnecting with exponential backoff when Redis drops.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use beacon_core::channels::Channels;
use futures::StreamExt;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tokio_util::sync::CancellationToken;

use crate::bus::{BrokerEvent, EventBus, Publisher};
use crate::error::EventError;

/// Delay before the first listener reconnection attempt.
const INITIAL_RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Upper bound on the delay between listener reconnection attempts.
const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(30);

/// Publisher and listener for the project's Redis channels.
#[derive(Clone)]
pub struct RedisPubSub {
    client: redis::Client,
    conn: MultiplexedConnection,
    channels: Channels,
}

impl RedisPubSub {
    /// Open a multiplexed command connection to `redis_url`.
    pub async fn connect(redis_url: &str, channels: Channels) -> Result<Self, EventError> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(Self {
            client,
            conn,
            channels,
        })
    }

    pub fn channels(&self) -> &Channels {
        &self.channels
    }

    /// A clone of the shared command connection.
    pub fn connection(&self) -> MultiplexedConnection {
        self.conn.clone()
    }

    /// Forward Redis messages onto `bus` until `cancel` fires.
    ///
    /// Subscription failures and dropped connections are logged and retried
    /// with exponential backoff.
    pub async fn run_listener(&self, bus: Arc<EventBus>, cancel: CancellationToken) {
        let mut delay = INITIAL_RECONNECT_DELAY;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                result = self.listen(&bus) => match result {
                    Ok(()) => {
                        tracing::warn!("Redis subscription stream ended");
                        delay = INITIAL_RECONNECT_DELAY;
                    }
                    Err(e) => {
                        tracing::error!(
                            error = %e,
                            delay_ms = delay.as_millis() as u64,
                            "Redis listener failed"
                        );
                    }
                },
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
            delay = next_delay(delay);
        }

        tracing::info!("Redis listener stopped");
    }

    /// Subscribe to every project channel and forward until the stream ends.
    async fn listen(&self, bus: &EventBus) -> Result<(), EventError> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        for channel in self.channels.all() {
            pubsub.subscribe(&channel).await?;
        }
        tracing::info!(project = %self.channels.project(), "Subscribed to Redis channels");

        let mut messages = pubsub.on_message();
        while let Some(msg) = messages.next().await {
            let channel = msg.get_channel_name().to_string();
            let payload: String = msg.get_payload().unwrap_or_default();

            match self
                .channels
                .suffix(&channel)
                .and_then(|suffix| BrokerEvent::from_message(suffix, &payload))
            {
                Some(event) => {
                    tracing::debug!(channel = %channel, "Broker message received");
                    bus.send(event);
                }
                None => {
                    tracing::debug!(channel = %channel, "Ignoring message on unexpected channel");
                }
            }
        }

        Ok(())
    }
}

#[async_trait]
impl Publisher for RedisPubSub {
    async fn publish(&self, event: BrokerEvent) -> Result<(), EventError> {
        let channel = self.channels.name(event.channel_suffix());
        let mut conn = self.conn.clone();
        let _: i64 = conn.publish(&channel, event.payload()).await?;
        Ok(())
    }
}

/// Double the delay, clamped to [`MAX_RECONNECT_DELAY`].
fn next_delay(current: Duration) -> Duration {
    (current * 2).min(MAX_RECONNECT_DELAY)
}
