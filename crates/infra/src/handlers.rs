//! Command and event handlers of the allocation service.
//!
//! Every handler opens its own [`Scope`] on the unit of work it is given, so
//! an error on any path rolls back whatever it changed. Outbound
//! dependencies (publisher, notifier) are passed in explicitly; the
//! bootstrap binds them.

use thiserror::Error;

use stockroom_allocation::{
    Allocate, Allocated, AllocationEvent, Batch, ChangeBatchQuantity, CreateBatch, Deallocated, OrderLine,
    OutOfStock, Product,
};
use stockroom_core::{BatchRef, DomainError, Sku};

use crate::notifications::{NotificationError, Notifications};
use crate::publisher::{LINE_ALLOCATED_CHANNEL, Publish, PublishError};
use crate::storage::{AllocationRow, StorageError};
use crate::unit_of_work::{Scope, UnitOfWork, UowError};

#[derive(Debug, Error)]
pub enum HandlerError {
    /// `Allocate` named a SKU with no batches.
    #[error("Invalid sku {0}")]
    InvalidSku(Sku),

    #[error("Unknown batch {0}")]
    UnknownBatch(BatchRef),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    UnitOfWork(#[from] UowError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error(transparent)]
    Notification(#[from] NotificationError),

    /// A handler was bound to a message type it cannot handle.
    #[error("handler received unexpected message `{0}`")]
    Misrouted(&'static str),
}

// ---- commands ---------------------------------------------------------

pub fn add_batch(cmd: &CreateBatch, uow: &mut dyn UnitOfWork) -> Result<(), HandlerError> {
    if cmd.qty == 0 {
        return Err(DomainError::validation("batch quantity must be positive").into());
    }

    let mut scope = Scope::enter(uow)?;
    let products = scope.products();
    // Batch references are unique across all products.
    if let Some(owner) = products.get_by_batchref(&cmd.reference)? {
        if owner.sku() != &cmd.sku {
            return Err(DomainError::conflict(format!(
                "batch {} already exists for sku {}",
                cmd.reference,
                owner.sku()
            ))
            .into());
        }
    }
    if products.get(&cmd.sku)?.is_none() {
        products.add(Product::new(cmd.sku.clone(), Vec::new()));
    }
    let product = products
        .get(&cmd.sku)?
        .ok_or_else(|| HandlerError::InvalidSku(cmd.sku.clone()))?;
    product.add_batch(Batch::new(cmd.reference.clone(), cmd.sku.clone(), cmd.qty, cmd.eta))?;
    scope.commit()?;
    Ok(())
}

/// Returns the batch the line went to, or `None` when out of stock.
pub fn allocate(cmd: &Allocate, uow: &mut dyn UnitOfWork) -> Result<Option<BatchRef>, HandlerError> {
    let line = OrderLine::new(cmd.orderid.clone(), cmd.sku.clone(), cmd.qty);

    let mut scope = Scope::enter(uow)?;
    let product = scope
        .products()
        .get(&line.sku)?
        .ok_or_else(|| HandlerError::InvalidSku(line.sku.clone()))?;
    let batchref = product.allocate(line)?;
    scope.commit()?;
    Ok(batchref)
}

pub fn change_batch_quantity(cmd: &ChangeBatchQuantity, uow: &mut dyn UnitOfWork) -> Result<(), HandlerError> {
    let mut scope = Scope::enter(uow)?;
    let product = scope
        .products()
        .get_by_batchref(&cmd.reference)?
        .ok_or_else(|| HandlerError::UnknownBatch(cmd.reference.clone()))?;
    product.change_batch_quantity(&cmd.reference, cmd.qty)?;
    scope.commit()?;
    Ok(())
}

// ---- events -----------------------------------------------------------

pub fn publish_allocated_event(event: &Allocated, publish: &Publish) -> Result<(), HandlerError> {
    publish(LINE_ALLOCATED_CHANNEL, &AllocationEvent::Allocated(event.clone()))?;
    Ok(())
}

pub fn add_allocation_to_read_model(event: &Allocated, uow: &mut dyn UnitOfWork) -> Result<(), HandlerError> {
    let mut scope = Scope::enter(uow)?;
    scope.views().insert(AllocationRow {
        orderid: event.orderid.clone(),
        sku: event.sku.clone(),
        batchref: event.batchref.clone(),
    });
    scope.commit()?;
    Ok(())
}

pub fn remove_allocation_from_read_model(
    event: &Deallocated,
    uow: &mut dyn UnitOfWork,
) -> Result<(), HandlerError> {
    let mut scope = Scope::enter(uow)?;
    scope.views().delete(&event.orderid, &event.sku);
    scope.commit()?;
    Ok(())
}

/// Put a deallocated line back through allocation.
pub fn reallocate(event: &Deallocated, uow: &mut dyn UnitOfWork) -> Result<(), HandlerError> {
    let cmd = Allocate {
        orderid: event.orderid.clone(),
        sku: event.sku.clone(),
        qty: event.qty,
    };
    allocate(&cmd, uow)?;
    Ok(())
}

pub fn send_out_of_stock_notification(
    event: &OutOfStock,
    notifications: &dyn Notifications,
    destination: &str,
) -> Result<(), HandlerError> {
    notifications.send(destination, &format!("Out of stock for {}", event.sku))?;
    Ok(())
}
