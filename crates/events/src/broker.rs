//! Outbound publish/subscribe abstraction (mechanics only).
//!
//! Handlers publish integration messages to named channels (e.g.
//! `line_allocated`) so other systems can react. The broker is the
//! transport: in-memory channels for tests and dev, Redis pub/sub in
//! production.
//!
//! Delivery is best effort and at-least-once at most; subscribers must be
//! idempotent. The broker stores nothing.

use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::Duration;

/// A subscription to one broker channel.
///
/// ```ignore
/// let subscription = broker.subscribe("line_allocated");
///
/// loop {
///     match subscription.recv_timeout(Duration::from_secs(1)) {
///         Ok(payload) => process(payload)?,
///         Err(std::sync::mpsc::RecvTimeoutError::Timeout) => continue,  // Check for shutdown
///         Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,  // Broker closed
///     }
/// }
/// ```
///
/// Subscriptions are meant for a single consuming thread. Messages arrive
/// in the order the broker received them.
#[derive(Debug)]
pub struct Subscription<M> {
    channel: String,
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(channel: impl Into<String>, receiver: Receiver<M>) -> Self {
        Self {
            channel: channel.into(),
            receiver,
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Block until the next message is available.
    pub fn recv(&self) -> Result<M, std::sync::mpsc::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, std::sync::mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, std::sync::mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Drain everything currently buffered without blocking.
    pub fn drain(&self) -> Vec<M> {
        self.receiver.try_iter().collect()
    }
}

/// Channel-addressed pub/sub transport.
///
/// `publish()` may fail (lock poisoning, network). Failures go back to the
/// caller, typically an event handler, whose error is then isolated and
/// reported by the message bus.
pub trait Broker<M>: Send + Sync {
    type Error: core::fmt::Debug + core::fmt::Display + Send + Sync + 'static;

    fn publish(&self, channel: &str, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self, channel: &str) -> Subscription<M>;
}

impl<M, B> Broker<M> for Arc<B>
where
    B: Broker<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, channel: &str, message: M) -> Result<(), Self::Error> {
        (**self).publish(channel, message)
    }

    fn subscribe(&self, channel: &str) -> Subscription<M> {
        (**self).subscribe(channel)
    }
}
