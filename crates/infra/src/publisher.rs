//! Outbound publishing of domain events to external channels.

use std::sync::{Arc, Mutex};

use thiserror::Error;

use stockroom_allocation::AllocationEvent;
use stockroom_events::Broker;

/// Channel that receives every allocation.
pub const LINE_ALLOCATED_CHANNEL: &str = "line_allocated";

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to serialize event: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("broker rejected publish to `{channel}`: {reason}")]
    Broker { channel: String, reason: String },
}

/// Publish function injected into handlers: `(channel, event)`.
pub type Publish = Arc<dyn Fn(&str, &AllocationEvent) -> Result<(), PublishError> + Send + Sync>;

/// Publish JSON payloads (see [`AllocationEvent::to_payload`]) through a
/// broker.
pub fn broker_publisher<B>(broker: B) -> Publish
where
    B: Broker<String> + 'static,
{
    Arc::new(move |channel: &str, event: &AllocationEvent| -> Result<(), PublishError> {
        let payload = serde_json::to_string(&event.to_payload()?)?;
        tracing::debug!(channel, event = %payload, "publishing event");
        broker.publish(channel, payload).map_err(|e| PublishError::Broker {
            channel: channel.to_string(),
            reason: e.to_string(),
        })
    })
}

/// Remembers what was published, per channel, in order.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<(String, AllocationEvent)>>,
}

impl RecordingPublisher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A [`Publish`] function recording into `self`.
    pub fn publish_fn(self: &Arc<Self>) -> Publish {
        let recorder = Arc::clone(self);
        Arc::new(move |channel: &str, event: &AllocationEvent| -> Result<(), PublishError> {
            let mut published = recorder.published.lock().map_err(|_| PublishError::Broker {
                channel: channel.to_string(),
                reason: "recorder lock poisoned".to_string(),
            })?;
            published.push((channel.to_string(), event.clone()));
            Ok(())
        })
    }

    pub fn published(&self) -> Vec<(String, AllocationEvent)> {
        self.published.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn published_to(&self, channel: &str) -> Vec<AllocationEvent> {
        self.published()
            .into_iter()
            .filter(|(c, _)| c == channel)
            .map(|(_, event)| event)
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut published) = self.published.lock() {
            published.clear();
        }
    }
}
