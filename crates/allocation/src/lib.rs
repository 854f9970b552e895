//! Allocation domain module.
//!
//! Business rules for allocating customer order lines to batches of
//! stock, implemented as deterministic domain logic (no IO, no storage,
//! no transport). Commands and events defined here are what the message
//! bus routes.

pub mod commands;
pub mod events;
pub mod messages;
pub mod model;

pub use commands::{Allocate, AllocationCommand, ChangeBatchQuantity, CreateBatch};
pub use events::{AllocationEvent, Allocated, Deallocated, OutOfStock};
pub use messages::{AllocationMessage, DecodeError, decode};
pub use model::{Batch, OrderLine, Product};
