//! Outbound notifications (e-mail, chat, ...).

use std::sync::{Arc, Mutex};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("notification to `{destination}` failed: {reason}")]
    Delivery { destination: String, reason: String },
}

/// Sends a human-readable message to a destination (address, channel).
pub trait Notifications: Send + Sync {
    fn send(&self, destination: &str, message: &str) -> Result<(), NotificationError>;
}

impl<N> Notifications for Arc<N>
where
    N: Notifications + ?Sized,
{
    fn send(&self, destination: &str, message: &str) -> Result<(), NotificationError> {
        (**self).send(destination, message)
    }
}

/// Default notifier: writes the notification to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifications;

impl Notifications for TracingNotifications {
    fn send(&self, destination: &str, message: &str) -> Result<(), NotificationError> {
        tracing::info!(destination, message, "notification sent");
        Ok(())
    }
}

/// Keeps every notification in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifications {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifications {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(destination, message)` pairs in send order.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Notifications for RecordingNotifications {
    fn send(&self, destination: &str, message: &str) -> Result<(), NotificationError> {
        let mut sent = self.sent.lock().map_err(|_| NotificationError::Delivery {
            destination: destination.to_string(),
            reason: "recorder lock poisoned".to_string(),
        })?;
        sent.push((destination.to_string(), message.to_string()));
        Ok(())
    }
}
