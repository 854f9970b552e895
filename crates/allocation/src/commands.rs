use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use stockroom_core::{BatchRef, OrderId, Sku};
use stockroom_events::Command;

/// Command: register a newly purchased batch of stock.
///
/// `eta` is `None` for stock already in the warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateBatch {
    #[serde(alias = "ref")]
    pub reference: BatchRef,
    pub sku: Sku,
    pub qty: u32,
    #[serde(default)]
    pub eta: Option<NaiveDate>,
}

/// Command: allocate an order line to the best available batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocate {
    pub orderid: OrderId,
    pub sku: Sku,
    pub qty: u32,
}

/// Command: correct the purchased quantity of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeBatchQuantity {
    #[serde(alias = "ref", alias = "batchref")]
    pub reference: BatchRef,
    pub qty: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AllocationCommand {
    CreateBatch(CreateBatch),
    Allocate(Allocate),
    ChangeBatchQuantity(ChangeBatchQuantity),
}

impl AllocationCommand {
    pub const CREATE_BATCH: &'static str = "CreateBatch";
    pub const ALLOCATE: &'static str = "Allocate";
    pub const CHANGE_BATCH_QUANTITY: &'static str = "ChangeBatchQuantity";
}

impl Command for AllocationCommand {
    fn command_type(&self) -> &'static str {
        match self {
            AllocationCommand::CreateBatch(_) => Self::CREATE_BATCH,
            AllocationCommand::Allocate(_) => Self::ALLOCATE,
            AllocationCommand::ChangeBatchQuantity(_) => Self::CHANGE_BATCH_QUANTITY,
        }
    }
}

impl From<CreateBatch> for AllocationCommand {
    fn from(value: CreateBatch) -> Self {
        Self::CreateBatch(value)
    }
}

impl From<Allocate> for AllocationCommand {
    fn from(value: Allocate) -> Self {
        Self::Allocate(value)
    }
}

impl From<ChangeBatchQuantity> for AllocationCommand {
    fn from(value: ChangeBatchQuantity) -> Self {
        Self::ChangeBatchQuantity(value)
    }
}
