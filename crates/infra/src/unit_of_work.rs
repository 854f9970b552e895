//! Unit of work: scoped transaction boundary around storage.
//!
//! ## Lifecycle
//!
//! ```text
//! Scope::enter(uow)          → uow.begin()     (fresh working set)
//!   products().get(..)       → aggregates loaded + tracked
//!   scope.commit()           → uow.commit()    (atomic, version checked)
//! drop(scope)                → uow.rollback()  (discard anything uncommitted)
//! bus: collect_new_events()  → events of every tracked aggregate
//! ```
//!
//! Rolling back after a commit is a no-op for persisted state, so the scope
//! guard always rolls back on exit: only explicit commits survive, on every
//! exit path including early `?` returns and panics.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use thiserror::Error;

use stockroom_allocation::AllocationEvent;
use stockroom_events::CollectEvents;

use crate::repository::{ProductRepository, TrackingRepository};
use crate::storage::{ChangeSet, Storage, StorageError};
use crate::views::{AllocationsTable, PendingViews};

#[derive(Debug, Error)]
pub enum UowError {
    #[error("commit called outside of an active unit of work scope")]
    NoActiveScope,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl UowError {
    /// The commit lost an optimistic concurrency race; retrying may succeed.
    pub fn is_conflict(&self) -> bool {
        matches!(self, UowError::Storage(StorageError::Concurrency(_)))
    }
}

/// Transaction boundary handed to every handler.
///
/// Object safe: handlers take `&mut dyn UnitOfWork` so tests can swap in a
/// fake without touching the bus.
pub trait UnitOfWork: CollectEvents<AllocationEvent> + Send {
    /// Open a fresh session. Prefer [`Scope::enter`], which also guarantees
    /// the rollback.
    fn begin(&mut self) -> Result<(), UowError>;

    fn products(&mut self) -> &mut dyn ProductRepository;

    fn views(&mut self) -> &mut dyn AllocationsTable;

    /// Persist every change made since `begin` (or the previous commit).
    fn commit(&mut self) -> Result<(), UowError>;

    /// Discard everything not yet committed. Cannot fail.
    fn rollback(&mut self);
}

/// RAII scope over a unit of work.
///
/// Derefs to the unit of work. Dropping the scope rolls back whatever was not
/// committed.
pub struct Scope<'a> {
    uow: &'a mut dyn UnitOfWork,
    committed: bool,
}

impl<'a> Scope<'a> {
    pub fn enter(uow: &'a mut dyn UnitOfWork) -> Result<Self, UowError> {
        uow.begin()?;
        Ok(Self {
            uow,
            committed: false,
        })
    }

    pub fn commit(&mut self) -> Result<(), UowError> {
        self.uow.commit()?;
        self.committed = true;
        Ok(())
    }
}

impl<'a> Deref for Scope<'a> {
    type Target = dyn UnitOfWork + 'a;

    fn deref(&self) -> &Self::Target {
        &*self.uow
    }
}

impl<'a> DerefMut for Scope<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.uow
    }
}

impl Drop for Scope<'_> {
    fn drop(&mut self) {
        if !self.committed {
            tracing::debug!("unit of work scope exited without commit; rolling back");
        }
        self.uow.rollback();
    }
}

/// Unit of work over a [`Storage`] backend.
#[derive(Debug)]
pub struct StorageUnitOfWork<S: ?Sized> {
    storage: Arc<S>,
    products: TrackingRepository<S>,
    views: PendingViews<S>,
    // Events of aggregates from scopes that already committed.
    committed_events: Vec<AllocationEvent>,
    active: bool,
}

impl<S: Storage + ?Sized> StorageUnitOfWork<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self {
            products: TrackingRepository::new(Arc::clone(&storage)),
            views: PendingViews::new(Arc::clone(&storage)),
            storage,
            committed_events: Vec::new(),
            active: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl<S: Storage + ?Sized> CollectEvents<AllocationEvent> for StorageUnitOfWork<S> {
    fn collect_new_events(&mut self) -> Vec<AllocationEvent> {
        let mut events = std::mem::take(&mut self.committed_events);
        events.extend(self.products.take_events());
        events
    }
}

impl<S: Storage + ?Sized> UnitOfWork for StorageUnitOfWork<S> {
    fn begin(&mut self) -> Result<(), UowError> {
        // Keep events of a previous committed scope for the bus to collect.
        let carried = self.products.take_events();
        self.committed_events.extend(carried);
        self.products.clear();
        self.views.clear();
        self.active = true;
        Ok(())
    }

    fn products(&mut self) -> &mut dyn ProductRepository {
        &mut self.products
    }

    fn views(&mut self) -> &mut dyn AllocationsTable {
        &mut self.views
    }

    fn commit(&mut self) -> Result<(), UowError> {
        if !self.active {
            return Err(UowError::NoActiveScope);
        }

        let changes = ChangeSet {
            products: self.products.pending_writes(),
            views: self.views.take_pending(),
        };
        if !changes.is_empty() {
            self.storage.apply(changes)?;
        }

        self.products.mark_committed();
        let events = self.products.take_events();
        self.committed_events.extend(events);
        Ok(())
    }

    fn rollback(&mut self) {
        self.products.clear();
        self.views.clear();
        self.active = false;
    }
}
