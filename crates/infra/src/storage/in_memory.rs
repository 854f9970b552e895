use std::sync::RwLock;

use stockroom_allocation::Product;
use stockroom_core::{BatchRef, OrderId, Sku};

use super::r#trait::{AllocationRow, ChangeSet, Storage, StorageError};
use super::state::StoreState;

/// In-memory storage.
///
/// Intended for tests/dev and as the disposable default backend.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    state: RwLock<StoreState>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current committed state.
    pub fn snapshot(&self) -> Result<StoreState, StorageError> {
        let state = self.state.read().map_err(|_| StorageError::Poisoned)?;
        Ok(state.clone())
    }
}

impl Storage for InMemoryStorage {
    fn init(&self) -> Result<(), StorageError> {
        Ok(())
    }

    fn load_product(&self, sku: &Sku) -> Result<Option<Product>, StorageError> {
        let state = self.state.read().map_err(|_| StorageError::Poisoned)?;
        Ok(state.product(sku))
    }

    fn find_product_by_batch(&self, reference: &BatchRef) -> Result<Option<Product>, StorageError> {
        let state = self.state.read().map_err(|_| StorageError::Poisoned)?;
        Ok(state.product_with_batch(reference))
    }

    fn allocations_for(&self, orderid: &OrderId) -> Result<Vec<AllocationRow>, StorageError> {
        let state = self.state.read().map_err(|_| StorageError::Poisoned)?;
        Ok(state.allocations_for(orderid))
    }

    fn apply(&self, changes: ChangeSet) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| StorageError::Poisoned)?;
        state.apply(changes)
    }
}
