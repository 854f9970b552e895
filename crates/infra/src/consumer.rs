//! Inbound pub/sub consumer: external messages -> bus commands.
//!
//! Runs on its own thread, reading one channel until the shutdown flag is
//! raised or the broker goes away. Bad payloads are logged and skipped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;

use serde_json::Value as JsonValue;
use thiserror::Error;

use stockroom_allocation::{AllocationCommand, DecodeError, decode};
use stockroom_events::{Broker, Subscription};

use crate::bootstrap::{App, AppError};

/// Channel other systems use to correct batch quantities.
pub const CHANGE_BATCH_QUANTITY_CHANNEL: &str = "change_batch_quantity";

#[derive(Debug, Error)]
pub enum ConsumeError {
    #[error("payload is not JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Handle(#[from] AppError),
}

/// Decode one `change_batch_quantity` payload and dispatch it.
pub fn handle_change_batch_quantity(app: &App, payload: &str) -> Result<(), ConsumeError> {
    let json: JsonValue = serde_json::from_str(payload)?;
    let message = decode(AllocationCommand::CHANGE_BATCH_QUANTITY, json)?;
    app.handle(message)?;
    Ok(())
}

/// Subscribe to [`CHANGE_BATCH_QUANTITY_CHANNEL`] on `broker`.
pub fn subscribe<B: Broker<String>>(broker: &B) -> Subscription<String> {
    tracing::info!(channel = CHANGE_BATCH_QUANTITY_CHANNEL, "subscribing");
    broker.subscribe(CHANGE_BATCH_QUANTITY_CHANNEL)
}

/// Consume until `shutdown` is set or the subscription disconnects.
///
/// `poll` bounds how long a shutdown request can go unnoticed. Returns the
/// number of messages handled successfully.
pub fn run(app: &App, subscription: &Subscription<String>, shutdown: &AtomicBool, poll: Duration) -> usize {
    let mut handled = 0;

    while !shutdown.load(Ordering::Relaxed) {
        match subscription.recv_timeout(poll) {
            Ok(payload) => {
                tracing::debug!(channel = subscription.channel(), payload = %payload, "message received");
                match handle_change_batch_quantity(app, &payload) {
                    Ok(()) => handled += 1,
                    Err(error) => {
                        tracing::error!(channel = subscription.channel(), %error, "failed to handle message")
                    }
                }
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                tracing::warn!(channel = subscription.channel(), "subscription closed");
                break;
            }
        }
    }

    handled
}
