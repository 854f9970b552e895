use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use stockroom_core::{AggregateRoot, BatchRef, DomainError, DomainResult, OrderId, Sku, ValueObject};

use crate::events::{Allocated, AllocationEvent, Deallocated, OutOfStock};

/// A customer wants `qty` units of `sku` for order `orderid`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderLine {
    pub orderid: OrderId,
    pub sku: Sku,
    pub qty: u32,
}

impl ValueObject for OrderLine {}

impl OrderLine {
    pub fn new(orderid: impl Into<OrderId>, sku: impl Into<Sku>, qty: u32) -> Self {
        Self {
            orderid: orderid.into(),
            sku: sku.into(),
            qty,
        }
    }
}

/// A purchased batch of stock, either in the warehouse (`eta == None`) or
/// on its way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    reference: BatchRef,
    sku: Sku,
    eta: Option<NaiveDate>,
    purchased_quantity: u32,
    allocations: Vec<OrderLine>,
}

impl Batch {
    pub fn new(reference: impl Into<BatchRef>, sku: impl Into<Sku>, qty: u32, eta: Option<NaiveDate>) -> Self {
        Self {
            reference: reference.into(),
            sku: sku.into(),
            eta,
            purchased_quantity: qty,
            allocations: Vec::new(),
        }
    }

    pub fn reference(&self) -> &BatchRef {
        &self.reference
    }

    pub fn sku(&self) -> &Sku {
        &self.sku
    }

    pub fn eta(&self) -> Option<NaiveDate> {
        self.eta
    }

    pub fn purchased_quantity(&self) -> u32 {
        self.purchased_quantity
    }

    pub fn allocations(&self) -> &[OrderLine] {
        &self.allocations
    }

    pub fn allocated_quantity(&self) -> i64 {
        self.allocations.iter().map(|l| i64::from(l.qty)).sum()
    }

    /// Negative after the purchased quantity was cut below what is allocated.
    pub fn available_quantity(&self) -> i64 {
        i64::from(self.purchased_quantity) - self.allocated_quantity()
    }

    pub fn is_allocated(&self, line: &OrderLine) -> bool {
        self.allocations.contains(line)
    }

    pub fn can_allocate(&self, line: &OrderLine) -> bool {
        self.sku == line.sku && self.available_quantity() >= i64::from(line.qty)
    }

    /// Allocating a line twice is a no-op.
    pub fn allocate(&mut self, line: OrderLine) {
        if self.can_allocate(&line) && !self.is_allocated(&line) {
            self.allocations.push(line);
        }
    }

    pub fn deallocate(&mut self, line: &OrderLine) {
        self.allocations.retain(|l| l != line);
    }

    /// Remove the most recently allocated line.
    pub fn deallocate_one(&mut self) -> Option<OrderLine> {
        self.allocations.pop()
    }

    /// In-stock batches first, then by earliest ETA.
    fn priority(&self) -> (bool, Option<NaiveDate>) {
        (self.eta.is_some(), self.eta)
    }
}

/// Aggregate root: all batches of one SKU.
///
/// Every allocation decision for a SKU goes through its `Product`, so the
/// product's `version_number` is what concurrent writers race on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    sku: Sku,
    batches: Vec<Batch>,
    version_number: u64,
    #[serde(skip)]
    events: Vec<AllocationEvent>,
}

impl Product {
    pub fn new(sku: impl Into<Sku>, batches: Vec<Batch>) -> Self {
        Self {
            sku: sku.into(),
            batches,
            version_number: 0,
            events: Vec::new(),
        }
    }

    pub fn sku(&self) -> &Sku {
        &self.sku
    }

    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    pub fn batch(&self, reference: &BatchRef) -> Option<&Batch> {
        self.batches.iter().find(|b| &b.reference == reference)
    }

    pub fn has_batch(&self, reference: &BatchRef) -> bool {
        self.batch(reference).is_some()
    }

    /// Events raised since the last `take_events`.
    pub fn pending_events(&self) -> &[AllocationEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<AllocationEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn add_batch(&mut self, batch: Batch) -> DomainResult<()> {
        if batch.sku != self.sku {
            return Err(DomainError::invariant(format!(
                "batch {} is for sku {}, not {}",
                batch.reference, batch.sku, self.sku
            )));
        }
        if self.has_batch(&batch.reference) {
            return Err(DomainError::conflict(format!(
                "batch {} already exists",
                batch.reference
            )));
        }
        self.batches.push(batch);
        self.version_number += 1;
        Ok(())
    }

    /// Allocate `line` to the preferred batch that can take it.
    ///
    /// Returns the chosen batch reference, or `None` (and raises
    /// `OutOfStock`) if no batch has room.
    pub fn allocate(&mut self, line: OrderLine) -> DomainResult<Option<BatchRef>> {
        if line.sku != self.sku {
            return Err(DomainError::invariant(format!(
                "order line for sku {} sent to product {}",
                line.sku, self.sku
            )));
        }
        if line.qty == 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }

        let mut candidates: Vec<usize> = (0..self.batches.len())
            .filter(|&i| self.batches[i].can_allocate(&line))
            .collect();
        candidates.sort_by_key(|&i| self.batches[i].priority());

        let Some(&chosen) = candidates.first() else {
            self.events
                .push(AllocationEvent::OutOfStock(OutOfStock { sku: line.sku }));
            return Ok(None);
        };

        let batch = &mut self.batches[chosen];
        let batchref = batch.reference.clone();
        self.events.push(AllocationEvent::Allocated(Allocated {
            orderid: line.orderid.clone(),
            sku: line.sku.clone(),
            qty: line.qty,
            batchref: batchref.clone(),
        }));
        batch.allocate(line);
        self.version_number += 1;
        Ok(Some(batchref))
    }

    /// Set a batch's purchased quantity, deallocating lines until it is no
    /// longer oversold. Each dropped line raises `Deallocated`.
    pub fn change_batch_quantity(&mut self, reference: &BatchRef, qty: u32) -> DomainResult<()> {
        let batch = self
            .batches
            .iter_mut()
            .find(|b| &b.reference == reference)
            .ok_or_else(|| DomainError::not_found(format!("batch {reference}")))?;

        batch.purchased_quantity = qty;
        while batch.available_quantity() < 0 {
            let Some(line) = batch.deallocate_one() else {
                break;
            };
            self.events.push(AllocationEvent::Deallocated(Deallocated {
                orderid: line.orderid,
                sku: line.sku,
                qty: line.qty,
            }));
        }
        self.version_number += 1;
        Ok(())
    }
}

impl AggregateRoot for Product {
    type Id = Sku;

    fn id(&self) -> &Self::Id {
        &self.sku
    }

    fn version(&self) -> u64 {
        self.version_number
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    fn line(orderid: &str, sku: &str, qty: u32) -> OrderLine {
        OrderLine::new(orderid, sku, qty)
    }

    fn batch_and_line(sku: &str, batch_qty: u32, line_qty: u32) -> (Batch, OrderLine) {
        (
            Batch::new("batch-001", sku, batch_qty, Some(today())),
            line("order-123", sku, line_qty),
        )
    }

    #[test]
    fn allocating_to_a_batch_reduces_the_available_quantity() {
        let (mut batch, line) = batch_and_line("SMALL-TABLE", 20, 2);
        batch.allocate(line);
        assert_eq!(batch.available_quantity(), 18);
    }

    #[test]
    fn can_allocate_if_available_greater_than_or_equal_to_required() {
        let (large, l) = batch_and_line("ELEGANT-LAMP", 20, 2);
        assert!(large.can_allocate(&l));
        let (exact, l) = batch_and_line("ELEGANT-LAMP", 2, 2);
        assert!(exact.can_allocate(&l));
        let (small, l) = batch_and_line("ELEGANT-LAMP", 2, 20);
        assert!(!small.can_allocate(&l));
    }

    #[test]
    fn cannot_allocate_if_skus_do_not_match() {
        let batch = Batch::new("batch-001", "UNCOMFORTABLE-CHAIR", 100, None);
        assert!(!batch.can_allocate(&line("order-123", "EXPENSIVE-TOASTER", 10)));
    }

    #[test]
    fn allocation_is_idempotent() {
        let (mut batch, line) = batch_and_line("ANGULAR-DESK", 20, 2);
        batch.allocate(line.clone());
        batch.allocate(line);
        assert_eq!(batch.available_quantity(), 18);
    }

    #[test]
    fn deallocate_only_removes_allocated_lines() {
        let (mut batch, allocated) = batch_and_line("DECORATIVE-TRINKET", 20, 2);
        batch.allocate(allocated.clone());
        batch.deallocate(&line("order-other", "DECORATIVE-TRINKET", 2));
        assert_eq!(batch.available_quantity(), 18);
        batch.deallocate(&allocated);
        assert_eq!(batch.available_quantity(), 20);
    }

    #[test]
    fn prefers_warehouse_batches_to_shipments() {
        let in_stock = Batch::new("in-stock-batch", "RETRO-CLOCK", 100, None);
        let shipment = Batch::new("shipment-batch", "RETRO-CLOCK", 100, Some(today() + Duration::days(1)));
        let mut product = Product::new("RETRO-CLOCK", vec![shipment, in_stock]);

        let chosen = product.allocate(line("oref", "RETRO-CLOCK", 10)).unwrap();

        assert_eq!(chosen, Some(BatchRef::new("in-stock-batch")));
        assert_eq!(product.batch(&"in-stock-batch".into()).unwrap().available_quantity(), 90);
        assert_eq!(product.batch(&"shipment-batch".into()).unwrap().available_quantity(), 100);
    }

    #[test]
    fn prefers_earlier_batches() {
        let earliest = Batch::new("speedy-batch", "MINIMALIST-SPOON", 100, Some(today()));
        let medium = Batch::new("normal-batch", "MINIMALIST-SPOON", 100, Some(today() + Duration::days(1)));
        let latest = Batch::new("slow-batch", "MINIMALIST-SPOON", 100, Some(today() + Duration::days(10)));
        let mut product = Product::new("MINIMALIST-SPOON", vec![medium, latest, earliest]);

        let chosen = product.allocate(line("order1", "MINIMALIST-SPOON", 10)).unwrap();

        assert_eq!(chosen, Some(BatchRef::new("speedy-batch")));
    }

    #[test]
    fn ties_keep_insertion_order() {
        let a = Batch::new("batch-a", "LAMP", 10, None);
        let b = Batch::new("batch-b", "LAMP", 10, None);
        let mut product = Product::new("LAMP", vec![a, b]);

        assert_eq!(
            product.allocate(line("o1", "LAMP", 10)).unwrap(),
            Some(BatchRef::new("batch-a"))
        );
    }

    #[test]
    fn records_allocated_event() {
        let batch = Batch::new("batchref", "RETRO-LAMPSHADE", 100, None);
        let mut product = Product::new("RETRO-LAMPSHADE", vec![batch]);

        product.allocate(line("o1", "RETRO-LAMPSHADE", 10)).unwrap();

        assert_eq!(
            product.pending_events(),
            &[AllocationEvent::Allocated(Allocated {
                orderid: OrderId::new("o1"),
                sku: Sku::new("RETRO-LAMPSHADE"),
                qty: 10,
                batchref: BatchRef::new("batchref"),
            })]
        );
    }

    #[test]
    fn records_out_of_stock_event_if_cannot_allocate() {
        let batch = Batch::new("batch1", "SMALL-FORK", 10, Some(today()));
        let mut product = Product::new("SMALL-FORK", vec![batch]);
        product.allocate(line("order1", "SMALL-FORK", 10)).unwrap();
        product.take_events();

        let allocation = product.allocate(line("order2", "SMALL-FORK", 1)).unwrap();

        assert_eq!(allocation, None);
        assert_eq!(
            product.take_events(),
            vec![AllocationEvent::OutOfStock(OutOfStock {
                sku: Sku::new("SMALL-FORK")
            })]
        );
    }

    #[test]
    fn increments_version_number_on_allocation() {
        let mut product = Product::new("SCANDI-PEN", vec![Batch::new("b1", "SCANDI-PEN", 100, None)]);
        let before = product.version();
        product.allocate(line("oref", "SCANDI-PEN", 10)).unwrap();
        assert_eq!(product.version(), before + 1);
    }

    #[test]
    fn rejects_zero_quantity_and_foreign_skus() {
        let mut product = Product::new("LAMP", vec![Batch::new("b1", "LAMP", 10, None)]);
        assert!(matches!(
            product.allocate(line("o1", "LAMP", 0)),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            product.allocate(line("o1", "CHAIR", 1)),
            Err(DomainError::InvariantViolation(_))
        ));
        assert!(product.pending_events().is_empty());
    }

    #[test]
    fn add_batch_rejects_duplicates() {
        let mut product = Product::new("LAMP", vec![Batch::new("b1", "LAMP", 10, None)]);
        let err = product.add_batch(Batch::new("b1", "LAMP", 5, None)).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert_eq!(product.batches().len(), 1);
    }

    #[test]
    fn change_batch_quantity_deallocates_until_not_oversold() {
        let mut product = Product::new("LAMP", vec![Batch::new("b1", "LAMP", 20, None)]);
        product.allocate(line("o1", "LAMP", 10)).unwrap();
        product.allocate(line("o2", "LAMP", 10)).unwrap();
        product.take_events();

        product.change_batch_quantity(&BatchRef::new("b1"), 15).unwrap();

        assert_eq!(
            product.take_events(),
            vec![AllocationEvent::Deallocated(Deallocated {
                orderid: OrderId::new("o2"),
                sku: Sku::new("LAMP"),
                qty: 10,
            })]
        );
        assert_eq!(product.batch(&BatchRef::new("b1")).unwrap().available_quantity(), 5);
    }

    #[test]
    fn change_batch_quantity_of_unknown_batch_is_not_found() {
        let mut product = Product::new("LAMP", vec![]);
        assert!(matches!(
            product.change_batch_quantity(&BatchRef::new("nope"), 1),
            Err(DomainError::NotFound(_))
        ));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 256,
                ..ProptestConfig::default()
            })]

            /// Property: allocated + available always equals purchased.
            #[test]
            fn quantities_balance(
                purchased in 0u32..500,
                lines in proptest::collection::vec(1u32..50, 0..20),
            ) {
                let mut batch = Batch::new("b", "SKU", purchased, None);
                for (i, qty) in lines.iter().enumerate() {
                    batch.allocate(OrderLine::new(format!("o{i}"), "SKU", *qty));
                }
                prop_assert_eq!(
                    batch.allocated_quantity() + batch.available_quantity(),
                    i64::from(purchased)
                );
                prop_assert!(batch.available_quantity() >= 0);
            }

            /// Property: after a quantity change the batch is never oversold,
            /// and every dropped line is reported exactly once.
            #[test]
            fn change_batch_quantity_never_leaves_batch_oversold(
                lines in proptest::collection::vec(1u32..20, 1..15),
                new_qty in 0u32..200,
            ) {
                let mut product = Product::new("SKU", vec![Batch::new("b", "SKU", 1_000, None)]);
                for (i, qty) in lines.iter().enumerate() {
                    product.allocate(OrderLine::new(format!("o{i}"), "SKU", *qty)).unwrap();
                }
                product.take_events();
                let allocated_before = product.batch(&"b".into()).unwrap().allocations().len();

                product.change_batch_quantity(&"b".into(), new_qty).unwrap();

                let dropped = product.take_events().len();
                let batch = product.batch(&"b".into()).unwrap();
                prop_assert!(batch.available_quantity() >= 0);
                prop_assert_eq!(dropped + batch.allocations().len(), allocated_before);
            }
        }
    }
}
