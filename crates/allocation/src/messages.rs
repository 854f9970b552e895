//! Message type of the allocation service and decoding of inbound payloads.

use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use thiserror::Error;

use stockroom_events::Message;

use crate::commands::{Allocate, AllocationCommand, ChangeBatchQuantity, CreateBatch};
use crate::events::{Allocated, AllocationEvent, Deallocated, OutOfStock};

/// Everything the allocation bus routes.
pub type AllocationMessage = Message<AllocationCommand, AllocationEvent>;

#[derive(Debug, Error)]
pub enum DecodeError {
    /// The message name is neither a known command nor a known event.
    #[error("unrecognized message type `{0}`")]
    UnrecognizedMessage(String),

    #[error("invalid `{message_type}` payload: {reason}")]
    InvalidPayload {
        message_type: &'static str,
        reason: String,
    },
}

/// Decode an external `(name, json)` pair into a typed message.
///
/// Inbound adapters (HTTP, pub/sub consumers) call this before handing the
/// message to the bus.
pub fn decode(message_type: &str, payload: JsonValue) -> Result<AllocationMessage, DecodeError> {
    let message = match message_type {
        AllocationCommand::CREATE_BATCH => {
            command(parse::<CreateBatch>(AllocationCommand::CREATE_BATCH, payload)?)
        }
        AllocationCommand::ALLOCATE => command(parse::<Allocate>(AllocationCommand::ALLOCATE, payload)?),
        AllocationCommand::CHANGE_BATCH_QUANTITY => command(parse::<ChangeBatchQuantity>(
            AllocationCommand::CHANGE_BATCH_QUANTITY,
            payload,
        )?),
        AllocationEvent::ALLOCATED => {
            Message::Event(AllocationEvent::Allocated(parse::<Allocated>(AllocationEvent::ALLOCATED, payload)?))
        }
        AllocationEvent::DEALLOCATED => Message::Event(AllocationEvent::Deallocated(parse::<Deallocated>(
            AllocationEvent::DEALLOCATED,
            payload,
        )?)),
        AllocationEvent::OUT_OF_STOCK => Message::Event(AllocationEvent::OutOfStock(parse::<OutOfStock>(
            AllocationEvent::OUT_OF_STOCK,
            payload,
        )?)),
        other => return Err(DecodeError::UnrecognizedMessage(other.to_string())),
    };
    Ok(message)
}

fn command(cmd: impl Into<AllocationCommand>) -> AllocationMessage {
    Message::Command(cmd.into())
}

fn parse<T: DeserializeOwned>(message_type: &'static str, payload: JsonValue) -> Result<T, DecodeError> {
    serde_json::from_value(payload).map_err(|e| DecodeError::InvalidPayload {
        message_type,
        reason: e.to_string(),
    })
}

impl From<AllocationCommand> for AllocationMessage {
    fn from(value: AllocationCommand) -> Self {
        Message::Command(value)
    }
}

impl From<AllocationEvent> for AllocationMessage {
    fn from(value: AllocationEvent) -> Self {
        Message::Event(value)
    }
}

macro_rules! impl_from_command {
    ($($t:ty),+ $(,)?) => {
        $(
            impl From<$t> for AllocationMessage {
                fn from(value: $t) -> Self {
                    Message::Command(value.into())
                }
            }
        )+
    };
}

impl_from_command!(CreateBatch, Allocate, ChangeBatchQuantity);
