use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use stockroom_allocation::Product;
use stockroom_core::{BatchRef, OrderId, Sku};

use super::r#trait::{AllocationRow, ChangeSet, Storage, StorageError};
use super::state::StoreState;

/// Storage backed by a single JSON document on disk.
///
/// Every commit rewrites the document through a temp file + rename so a
/// crash never leaves a half-written file behind. Point it at a temp path
/// for a real-but-disposable store in tests.
#[derive(Debug)]
pub struct JsonFileStorage {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_state(&self) -> Result<StoreState, StorageError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StoreState::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_state(&self, state: &StoreState) -> Result<(), StorageError> {
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(state)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn read_locked(&self) -> Result<StoreState, StorageError> {
        let _guard = self.lock.lock().map_err(|_| StorageError::Poisoned)?;
        self.read_state()
    }
}

impl Storage for JsonFileStorage {
    fn init(&self) -> Result<(), StorageError> {
        let _guard = self.lock.lock().map_err(|_| StorageError::Poisoned)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        if !self.path.exists() {
            self.write_state(&StoreState::default())?;
            tracing::info!(path = %self.path.display(), "created storage document");
        }
        Ok(())
    }

    fn load_product(&self, sku: &Sku) -> Result<Option<Product>, StorageError> {
        Ok(self.read_locked()?.product(sku))
    }

    fn find_product_by_batch(&self, reference: &BatchRef) -> Result<Option<Product>, StorageError> {
        Ok(self.read_locked()?.product_with_batch(reference))
    }

    fn allocations_for(&self, orderid: &OrderId) -> Result<Vec<AllocationRow>, StorageError> {
        Ok(self.read_locked()?.allocations_for(orderid))
    }

    fn apply(&self, changes: ChangeSet) -> Result<(), StorageError> {
        let _guard = self.lock.lock().map_err(|_| StorageError::Poisoned)?;
        let mut state = self.read_state()?;
        state.apply(changes)?;
        self.write_state(&state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ProductWrite;
    use stockroom_allocation::Batch;
    use stockroom_core::ExpectedVersion;

    fn temp_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("stockroom-test-{}", uuid::Uuid::now_v7()))
            .join("store.json")
    }

    #[test]
    fn init_creates_an_empty_document() {
        let storage = JsonFileStorage::new(temp_path());
        storage.init().unwrap();
        storage.init().unwrap();

        assert!(storage.path().exists());
        assert_eq!(storage.load_product(&"LAMP".into()).unwrap(), None);

        let _ = fs::remove_dir_all(storage.path().parent().unwrap());
    }

    #[test]
    fn committed_products_survive_a_new_handle() {
        let path = temp_path();
        let storage = JsonFileStorage::new(&path);
        storage.init().unwrap();
        let product = Product::new("LAMP", vec![Batch::new("b1", "LAMP", 10, None)]);
        storage
            .apply(ChangeSet {
                products: vec![ProductWrite {
                    product: product.clone(),
                    expected: ExpectedVersion::Absent,
                }],
                views: vec![],
            })
            .unwrap();

        let reopened = JsonFileStorage::new(&path);

        assert_eq!(reopened.load_product(&"LAMP".into()).unwrap(), Some(product.clone()));
        assert_eq!(reopened.find_product_by_batch(&"b1".into()).unwrap(), Some(product));

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
