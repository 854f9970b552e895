use serde::{Deserialize, Serialize};

use stockroom_core::{BatchRef, OrderId, Sku};
use stockroom_events::Event;

/// Event: an order line was allocated to a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocated {
    pub orderid: OrderId,
    pub sku: Sku,
    pub qty: u32,
    pub batchref: BatchRef,
}

/// Event: an order line lost its allocation (batch quantity shrank).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deallocated {
    pub orderid: OrderId,
    pub sku: Sku,
    pub qty: u32,
}

/// Event: no batch could take an order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutOfStock {
    pub sku: Sku,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AllocationEvent {
    Allocated(Allocated),
    Deallocated(Deallocated),
    OutOfStock(OutOfStock),
}

impl AllocationEvent {
    pub const ALLOCATED: &'static str = "Allocated";
    pub const DEALLOCATED: &'static str = "Deallocated";
    pub const OUT_OF_STOCK: &'static str = "OutOfStock";

    /// JSON body of the event without the enum tag, as published to
    /// external channels.
    pub fn to_payload(&self) -> serde_json::Result<serde_json::Value> {
        match self {
            AllocationEvent::Allocated(e) => serde_json::to_value(e),
            AllocationEvent::Deallocated(e) => serde_json::to_value(e),
            AllocationEvent::OutOfStock(e) => serde_json::to_value(e),
        }
    }
}

impl Event for AllocationEvent {
    fn event_type(&self) -> &'static str {
        match self {
            AllocationEvent::Allocated(_) => Self::ALLOCATED,
            AllocationEvent::Deallocated(_) => Self::DEALLOCATED,
            AllocationEvent::OutOfStock(_) => Self::OUT_OF_STOCK,
        }
    }
}
