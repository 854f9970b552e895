//! `stockroom-core`: domain foundation building blocks.
//!
//! Pure domain primitives shared by the allocation model and the
//! infrastructure layer. Nothing in here performs IO.

pub mod aggregate;
pub mod error;
pub mod id;
pub mod value_object;

pub use aggregate::{AggregateRoot, ExpectedVersion};
pub use error::{DomainError, DomainResult};
pub use id::{BatchRef, OrderId, Sku};
pub use value_object::ValueObject;
