use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use stockroom_allocation::Product;
use stockroom_core::{AggregateRoot, BatchRef, OrderId, Sku};

use super::r#trait::{AllocationRow, ChangeSet, StorageError};

/// Complete persisted state: products by SKU plus the allocations view.
///
/// Shared by the storage backends; the JSON backend serializes it as one
/// document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreState {
    products: BTreeMap<Sku, Product>,
    allocations_view: Vec<AllocationRow>,
}

impl StoreState {
    pub fn product(&self, sku: &Sku) -> Option<Product> {
        self.products.get(sku).cloned()
    }

    pub fn product_with_batch(&self, reference: &BatchRef) -> Option<Product> {
        self.products
            .values()
            .find(|p| p.has_batch(reference))
            .cloned()
    }

    pub fn allocations_for(&self, orderid: &OrderId) -> Vec<AllocationRow> {
        self.allocations_view
            .iter()
            .filter(|r| &r.orderid == orderid)
            .cloned()
            .collect()
    }

    pub fn product_count(&self) -> usize {
        self.products.len()
    }

    /// Apply `changes` to a copy and swap it in only if every check passes.
    pub fn apply(&mut self, changes: ChangeSet) -> Result<(), StorageError> {
        let mut next = self.clone();

        for write in changes.products {
            let sku = write.product.sku().clone();
            let actual = next.products.get(&sku).map(|p| p.version());
            write
                .expected
                .check(actual)
                .map_err(|e| StorageError::Concurrency(format!("product {sku}: {e}")))?;

            let mut product = write.product;
            product.take_events();
            next.products.insert(sku, product);
        }

        for change in &changes.views {
            change.apply_to(&mut next.allocations_view);
        }

        *self = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{ProductWrite, ViewChange};
    use stockroom_allocation::{Batch, OrderLine};
    use stockroom_core::ExpectedVersion;

    fn write(product: Product, expected: ExpectedVersion) -> ChangeSet {
        ChangeSet {
            products: vec![ProductWrite { product, expected }],
            views: vec![],
        }
    }

    #[test]
    fn stale_writes_leave_state_untouched() {
        let mut state = StoreState::default();
        let product = Product::new("LAMP", vec![Batch::new("b1", "LAMP", 10, None)]);
        state.apply(write(product.clone(), ExpectedVersion::Absent)).unwrap();

        let mut changed = product.clone();
        changed.allocate(OrderLine::new("o1", "LAMP", 1)).unwrap();
        let mut changes = write(changed, ExpectedVersion::Exact(7));
        changes.views.push(ViewChange::Insert(AllocationRow {
            orderid: "o1".into(),
            sku: "LAMP".into(),
            batchref: "b1".into(),
        }));

        let err = state.apply(changes).unwrap_err();

        assert!(matches!(err, StorageError::Concurrency(_)));
        assert_eq!(state.product(&"LAMP".into()), Some(product));
        assert!(state.allocations_for(&"o1".into()).is_empty());
    }

    #[test]
    fn stored_products_carry_no_pending_events() {
        let mut state = StoreState::default();
        let mut product = Product::new("LAMP", vec![Batch::new("b1", "LAMP", 10, None)]);
        product.allocate(OrderLine::new("o1", "LAMP", 1)).unwrap();
        assert!(!product.pending_events().is_empty());

        state.apply(write(product, ExpectedVersion::Absent)).unwrap();

        assert!(state.product(&"LAMP".into()).unwrap().pending_events().is_empty());
    }

    #[test]
    fn view_changes_apply_in_order() {
        let mut state = StoreState::default();
        let row = |batch: &str| AllocationRow {
            orderid: "o1".into(),
            sku: "LAMP".into(),
            batchref: batch.into(),
        };
        state
            .apply(ChangeSet {
                products: vec![],
                views: vec![
                    ViewChange::Insert(row("b1")),
                    ViewChange::Delete {
                        orderid: "o1".into(),
                        sku: "LAMP".into(),
                    },
                    ViewChange::Insert(row("b2")),
                ],
            })
            .unwrap();

        assert_eq!(state.allocations_for(&"o1".into()), vec![row("b2")]);
    }
}
