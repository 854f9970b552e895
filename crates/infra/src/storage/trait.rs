use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use stockroom_allocation::Product;
use stockroom_core::{BatchRef, ExpectedVersion, OrderId, Sku};

/// One row of the `allocations_view` read model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationRow {
    pub orderid: OrderId,
    pub sku: Sku,
    pub batchref: BatchRef,
}

/// A read-model mutation, applied in order at commit time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewChange {
    Insert(AllocationRow),
    /// Remove every row for `(orderid, sku)`.
    Delete { orderid: OrderId, sku: Sku },
}

impl ViewChange {
    /// Apply to the rows of a table (or of one order's slice of it).
    pub fn apply_to(&self, rows: &mut Vec<AllocationRow>) {
        match self {
            ViewChange::Insert(row) => rows.push(row.clone()),
            ViewChange::Delete { orderid, sku } => {
                rows.retain(|r| !(&r.orderid == orderid && &r.sku == sku))
            }
        }
    }

    pub fn orderid(&self) -> &OrderId {
        match self {
            ViewChange::Insert(row) => &row.orderid,
            ViewChange::Delete { orderid, .. } => orderid,
        }
    }
}

/// A product to persist, with the version the writer expects to replace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductWrite {
    pub product: Product,
    pub expected: ExpectedVersion,
}

/// Everything one unit-of-work commit persists, all or nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub products: Vec<ProductWrite>,
    pub views: Vec<ViewChange>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.products.is_empty() && self.views.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("storage lock poisoned")]
    Poisoned,

    #[error("storage io failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage document is corrupt: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Product + read-model persistence.
///
/// Implementations must:
/// - apply a `ChangeSet` atomically (every write or none)
/// - reject a product write whose `expected` version does not match the
///   stored one
/// - never return pending domain events as part of a loaded product
pub trait Storage: Send + Sync {
    /// Prepare the backend (create files, tables). Idempotent.
    fn init(&self) -> Result<(), StorageError>;

    fn load_product(&self, sku: &Sku) -> Result<Option<Product>, StorageError>;

    /// The product owning the batch with `reference`, if any.
    fn find_product_by_batch(&self, reference: &BatchRef) -> Result<Option<Product>, StorageError>;

    fn allocations_for(&self, orderid: &OrderId) -> Result<Vec<AllocationRow>, StorageError>;

    fn apply(&self, changes: ChangeSet) -> Result<(), StorageError>;
}

impl<S> Storage for Arc<S>
where
    S: Storage + ?Sized,
{
    fn init(&self) -> Result<(), StorageError> {
        (**self).init()
    }

    fn load_product(&self, sku: &Sku) -> Result<Option<Product>, StorageError> {
        (**self).load_product(sku)
    }

    fn find_product_by_batch(&self, reference: &BatchRef) -> Result<Option<Product>, StorageError> {
        (**self).find_product_by_batch(reference)
    }

    fn allocations_for(&self, orderid: &OrderId) -> Result<Vec<AllocationRow>, StorageError> {
        (**self).allocations_for(orderid)
    }

    fn apply(&self, changes: ChangeSet) -> Result<(), StorageError> {
        (**self).apply(changes)
    }
}
