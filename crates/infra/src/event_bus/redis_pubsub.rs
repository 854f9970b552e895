//! Redis pub/sub broker (optional).
//!
//! Note: Redis pub/sub is not durable (messages are dropped while no
//! subscriber is connected). Payloads are plain strings, one JSON document
//! per message.

use std::sync::mpsc;
use std::thread;

use redis::Commands;
use thiserror::Error;

use stockroom_events::{Broker, Subscription};

#[derive(Debug, Error)]
pub enum RedisBrokerError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Redis pub/sub broker for string payloads.
#[derive(Debug, Clone)]
pub struct RedisBroker {
    client: redis::Client,
}

impl RedisBroker {
    pub fn new(redis_url: impl AsRef<str>) -> Result<Self, RedisBrokerError> {
        let client = redis::Client::open(redis_url.as_ref())?;
        Ok(Self { client })
    }
}

impl Broker<String> for RedisBroker {
    type Error = RedisBrokerError;

    fn publish(&self, channel: &str, message: String) -> Result<(), Self::Error> {
        let mut conn = self.client.get_connection()?;
        let receivers: i64 = conn.publish(channel, message)?;
        tracing::debug!(channel, receivers, "published to redis");
        Ok(())
    }

    fn subscribe(&self, channel: &str) -> Subscription<String> {
        let (tx, rx) = mpsc::channel();

        let client = self.client.clone();
        let name = channel.to_string();

        // Background thread that receives pub/sub messages and forwards them.
        // Dropping the subscription ends it on the next message.
        thread::spawn(move || {
            let mut conn = match client.get_connection() {
                Ok(c) => c,
                Err(error) => {
                    tracing::error!(channel = %name, %error, "redis connection failed");
                    return;
                }
            };

            let mut pubsub = conn.as_pubsub();
            if let Err(error) = pubsub.subscribe(&name) {
                tracing::error!(channel = %name, %error, "redis subscribe failed");
                return;
            }

            loop {
                let msg = match pubsub.get_message() {
                    Ok(m) => m,
                    Err(error) => {
                        tracing::warn!(channel = %name, %error, "redis subscription ended");
                        return;
                    }
                };

                let payload: String = match msg.get_payload() {
                    Ok(p) => p,
                    Err(_) => continue,
                };

                if tx.send(payload).is_err() {
                    return;
                }
            }
        });

        Subscription::new(channel, rx)
    }
}
