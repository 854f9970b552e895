//! Product repository: the unit of work's view of aggregates.

use std::sync::Arc;

use stockroom_allocation::{AllocationEvent, Product};
use stockroom_core::{AggregateRoot, BatchRef, ExpectedVersion, Sku};

use crate::storage::{ProductWrite, Storage, StorageError};

/// Access to `Product` aggregates within a unit of work.
///
/// Returned references point into the unit of work's working set; changes
/// become durable only when the unit of work commits.
pub trait ProductRepository {
    /// Track a brand-new product. Committing fails if the SKU already exists
    /// in storage.
    fn add(&mut self, product: Product);

    fn get(&mut self, sku: &Sku) -> Result<Option<&mut Product>, StorageError>;

    fn get_by_batchref(&mut self, reference: &BatchRef) -> Result<Option<&mut Product>, StorageError>;
}

#[derive(Debug)]
struct Tracked {
    product: Product,
    expected: ExpectedVersion,
}

/// Repository that remembers every product it hands out (`seen`), so the
/// unit of work can persist them and collect their events.
#[derive(Debug)]
pub struct TrackingRepository<S: ?Sized> {
    storage: Arc<S>,
    seen: Vec<Tracked>,
}

impl<S: Storage + ?Sized> TrackingRepository<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self {
            storage,
            seen: Vec::new(),
        }
    }

    fn position(&self, predicate: impl Fn(&Product) -> bool) -> Option<usize> {
        self.seen.iter().position(|t| predicate(&t.product))
    }

    fn track_loaded(&mut self, product: Product) -> usize {
        let expected = ExpectedVersion::Exact(product.version());
        self.seen.push(Tracked { product, expected });
        self.seen.len() - 1
    }

    /// Writes for every tracked product, checked against the version each was
    /// loaded (or last committed) at.
    pub(crate) fn pending_writes(&self) -> Vec<ProductWrite> {
        self.seen
            .iter()
            .map(|t| ProductWrite {
                product: t.product.clone(),
                expected: t.expected,
            })
            .collect()
    }

    /// After a successful commit, the stored version is the new baseline.
    pub(crate) fn mark_committed(&mut self) {
        for tracked in &mut self.seen {
            tracked.expected = ExpectedVersion::Exact(tracked.product.version());
        }
    }

    pub(crate) fn take_events(&mut self) -> Vec<AllocationEvent> {
        self.seen
            .iter_mut()
            .flat_map(|t| t.product.take_events())
            .collect()
    }

    /// Forget the working set.
    pub(crate) fn clear(&mut self) {
        self.seen.clear();
    }

    pub fn seen(&self) -> impl Iterator<Item = &Product> {
        self.seen.iter().map(|t| &t.product)
    }
}

impl<S: Storage + ?Sized> ProductRepository for TrackingRepository<S> {
    fn add(&mut self, product: Product) {
        self.seen.push(Tracked {
            product,
            expected: ExpectedVersion::Absent,
        });
    }

    fn get(&mut self, sku: &Sku) -> Result<Option<&mut Product>, StorageError> {
        let idx = match self.position(|p| p.sku() == sku) {
            Some(idx) => idx,
            None => match self.storage.load_product(sku)? {
                Some(product) => self.track_loaded(product),
                None => return Ok(None),
            },
        };
        Ok(Some(&mut self.seen[idx].product))
    }

    fn get_by_batchref(&mut self, reference: &BatchRef) -> Result<Option<&mut Product>, StorageError> {
        let idx = match self.position(|p| p.has_batch(reference)) {
            Some(idx) => idx,
            None => match self.storage.find_product_by_batch(reference)? {
                // The batch may belong to a product already tracked under its
                // pre-batch state; keep the tracked copy.
                Some(product) => match self.position(|p| p.sku() == product.sku()) {
                    Some(_) => return Ok(None),
                    None => self.track_loaded(product),
                },
                None => return Ok(None),
            },
        };
        Ok(Some(&mut self.seen[idx].product))
    }
}
