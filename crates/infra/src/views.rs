//! Allocations read model: the query side.
//!
//! Event handlers keep `allocations_view` up to date; queries read it
//! without touching the `Product` aggregate.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use stockroom_core::{BatchRef, OrderId, Sku};

use crate::storage::{AllocationRow, Storage, StorageError, ViewChange};
use crate::unit_of_work::{Scope, UnitOfWork, UowError};

/// What `GET /allocations/{orderid}` returns per line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationView {
    pub sku: Sku,
    pub batchref: BatchRef,
}

/// The `allocations_view` table as seen from inside a unit of work.
///
/// Writes are buffered until commit; reads see committed rows plus this
/// unit of work's own buffered writes.
pub trait AllocationsTable {
    fn insert(&mut self, row: AllocationRow);

    fn delete(&mut self, orderid: &OrderId, sku: &Sku);

    fn for_order(&self, orderid: &OrderId) -> Result<Vec<AllocationRow>, StorageError>;
}

/// Storage-backed `AllocationsTable` with buffered writes.
#[derive(Debug)]
pub struct PendingViews<S: ?Sized> {
    storage: Arc<S>,
    pending: Vec<ViewChange>,
}

impl<S: Storage + ?Sized> PendingViews<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self {
            storage,
            pending: Vec::new(),
        }
    }

    pub(crate) fn take_pending(&mut self) -> Vec<ViewChange> {
        std::mem::take(&mut self.pending)
    }

    pub(crate) fn clear(&mut self) {
        self.pending.clear();
    }
}

impl<S: Storage + ?Sized> AllocationsTable for PendingViews<S> {
    fn insert(&mut self, row: AllocationRow) {
        self.pending.push(ViewChange::Insert(row));
    }

    fn delete(&mut self, orderid: &OrderId, sku: &Sku) {
        self.pending.push(ViewChange::Delete {
            orderid: orderid.clone(),
            sku: sku.clone(),
        });
    }

    fn for_order(&self, orderid: &OrderId) -> Result<Vec<AllocationRow>, StorageError> {
        let mut rows = self.storage.allocations_for(orderid)?;
        for change in self.pending.iter().filter(|c| c.orderid() == orderid) {
            change.apply_to(&mut rows);
        }
        Ok(rows)
    }
}

/// Allocations of one order, from the read model.
pub fn allocations(orderid: &OrderId, uow: &mut dyn UnitOfWork) -> Result<Vec<AllocationView>, UowError> {
    let mut scope = Scope::enter(uow)?;
    let rows = scope.views().for_order(orderid)?;
    Ok(rows
        .into_iter()
        .map(|row| AllocationView {
            sku: row.sku,
            batchref: row.batchref,
        })
        .collect())
}
