//! In-memory broker for tests/dev.

use std::collections::HashMap;
use std::sync::{Mutex, mpsc};

use thiserror::Error;

use crate::broker::{Broker, Subscription};

#[derive(Debug, Error)]
pub enum InMemoryBrokerError {
    /// Publish failed due to internal lock poisoning.
    #[error("in-memory broker lock poisoned")]
    Poisoned,
}

/// In-memory pub/sub broker.
///
/// - No IO / no async
/// - Fan-out per channel; publishing to a channel nobody listens on is a no-op
/// - Dead subscribers are pruned on publish
#[derive(Debug)]
pub struct InMemoryBroker<M> {
    channels: Mutex<HashMap<String, Vec<mpsc::Sender<M>>>>,
}

impl<M> InMemoryBroker<M> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<M> Default for InMemoryBroker<M> {
    fn default() -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
        }
    }
}

impl<M> Broker<M> for InMemoryBroker<M>
where
    M: Clone + Send + 'static,
{
    type Error = InMemoryBrokerError;

    fn publish(&self, channel: &str, message: M) -> Result<(), Self::Error> {
        let mut channels = self
            .channels
            .lock()
            .map_err(|_| InMemoryBrokerError::Poisoned)?;

        if let Some(subs) = channels.get_mut(channel) {
            subs.retain(|tx| tx.send(message.clone()).is_ok());
        }

        Ok(())
    }

    fn subscribe(&self, channel: &str) -> Subscription<M> {
        let (tx, rx) = mpsc::channel();

        // A poisoned lock still yields a subscription; it just never receives.
        if let Ok(mut channels) = self.channels.lock() {
            channels.entry(channel.to_string()).or_default().push(tx);
        }

        Subscription::new(channel, rx)
    }
}
