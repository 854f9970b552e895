//! Message mechanics: commands, events, handler registry and the message bus.
//!
//! This crate is domain-agnostic. A concrete application describes its
//! message and unit-of-work types through [`Routing`] and gets a
//! synchronous [`MessageBus`] that routes commands to exactly one handler
//! (failures propagate) and events to any number of handlers (failures are
//! isolated and reported).

pub mod broker;
pub mod bus;
pub mod command;
pub mod event;
pub mod handler;
pub mod in_memory_broker;
pub mod message;
pub mod report;

pub use broker::{Broker, Subscription};
pub use bus::{BusError, Handled, MessageBus};
pub use command::Command;
pub use event::{CollectEvents, Event};
pub use handler::{CommandHandler, EventHandler, HandlerRegistry, RegistryError, Routing};
pub use in_memory_broker::{InMemoryBroker, InMemoryBrokerError};
pub use message::Message;
pub use report::{DispatchReport, HandlerOutcome};
