//! Persistence boundary for products and the allocations read model.
//!
//! Units of work talk to a `Storage`; the backends here are deliberately
//! simple (an in-memory map and a JSON document on disk). Both apply a
//! change set atomically and enforce optimistic concurrency on products.

pub mod in_memory;
pub mod json_file;
pub mod state;
pub mod r#trait;

pub use in_memory::InMemoryStorage;
pub use json_file::JsonFileStorage;
pub use state::StoreState;
pub use r#trait::{AllocationRow, ChangeSet, ProductWrite, Storage, StorageError, ViewChange};
