//! Infrastructure layer of the allocation service: unit of work, storage,
//! handlers, configuration and the composition root.

pub mod bootstrap;
pub mod config;
pub mod consumer;
pub mod event_bus;
pub mod handlers;
pub mod notifications;
pub mod publisher;
pub mod repository;
pub mod storage;
pub mod unit_of_work;
pub mod views;

pub use bootstrap::{AllocationRouting, App, AppError, Bootstrap, BootstrapError};
pub use config::Settings;
pub use handlers::HandlerError;
pub use unit_of_work::{Scope, StorageUnitOfWork, UnitOfWork, UowError};

#[cfg(test)]
mod integration_tests;
