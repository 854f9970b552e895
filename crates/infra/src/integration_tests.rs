//! Integration tests for the full message pipeline.
//!
//! Tests: Command → handler → UnitOfWork commit → collected events →
//! event handlers → read model / publisher / notifications
//!
//! Verifies:
//! - Cascading events are dispatched before `handle` returns
//! - Failed commands leave storage untouched
//! - Read model follows allocations and deallocations
//! - Optimistic concurrency conflicts surface as handler errors

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use chrono::NaiveDate;

    use stockroom_allocation::{Allocate, AllocationEvent, ChangeBatchQuantity, CreateBatch};
    use stockroom_core::{BatchRef, DomainError, OrderId, Sku};
    use stockroom_events::BusError;

    use crate::bootstrap::{App, Bootstrap};
    use crate::handlers::HandlerError;
    use crate::notifications::RecordingNotifications;
    use crate::publisher::{LINE_ALLOCATED_CHANNEL, RecordingPublisher};
    use crate::storage::{AllocationRow, ChangeSet, InMemoryStorage, Storage, StorageError};
    use crate::unit_of_work::{Scope, StorageUnitOfWork, UowError};
    use crate::views::{self, AllocationView};

    struct Harness {
        app: App,
        storage: Arc<InMemoryStorage>,
        publisher: Arc<RecordingPublisher>,
        notifications: Arc<RecordingNotifications>,
    }

    fn setup() -> Harness {
        let storage = Arc::new(InMemoryStorage::new());
        let publisher = RecordingPublisher::new();
        let notifications = Arc::new(RecordingNotifications::new());

        let app = Bootstrap::default()
            .without_initializer()
            .with_storage(storage.clone())
            .with_publish(publisher.publish_fn())
            .with_notifications(notifications.clone())
            .build()
            .unwrap();

        Harness {
            app,
            storage,
            publisher,
            notifications,
        }
    }

    /// In-memory storage whose commits can be switched to fail.
    struct FlakyStorage {
        inner: InMemoryStorage,
        reject_writes: AtomicBool,
    }

    impl Storage for FlakyStorage {
        fn init(&self) -> Result<(), StorageError> {
            self.inner.init()
        }

        fn load_product(&self, sku: &Sku) -> Result<Option<stockroom_allocation::Product>, StorageError> {
            self.inner.load_product(sku)
        }

        fn find_product_by_batch(
            &self,
            reference: &BatchRef,
        ) -> Result<Option<stockroom_allocation::Product>, StorageError> {
            self.inner.find_product_by_batch(reference)
        }

        fn allocations_for(&self, orderid: &OrderId) -> Result<Vec<AllocationRow>, StorageError> {
            self.inner.allocations_for(orderid)
        }

        fn apply(&self, changes: ChangeSet) -> Result<(), StorageError> {
            if self.reject_writes.load(Ordering::SeqCst) {
                return Err(StorageError::Io(std::io::Error::other("disk full")));
            }
            self.inner.apply(changes)
        }
    }

    fn create_batch(reference: &str, sku: &str, qty: u32, eta: Option<NaiveDate>) -> CreateBatch {
        CreateBatch {
            reference: reference.into(),
            sku: sku.into(),
            qty,
            eta,
        }
    }

    fn allocate(orderid: &str, sku: &str, qty: u32) -> Allocate {
        Allocate {
            orderid: orderid.into(),
            sku: sku.into(),
            qty,
        }
    }

    fn allocations(h: &Harness, orderid: &str) -> Vec<AllocationView> {
        let mut uow = h.app.uow();
        views::allocations(&OrderId::new(orderid), uow.as_mut()).unwrap()
    }

    #[test]
    fn add_batch_for_new_product() {
        let h = setup();
        h.app.handle(create_batch("b1", "CRUNCHY-ARMCHAIR", 100, None)).unwrap();

        let product = h.storage.load_product(&Sku::new("CRUNCHY-ARMCHAIR")).unwrap().unwrap();
        assert!(product.has_batch(&BatchRef::new("b1")));
    }

    #[test]
    fn add_batch_for_existing_product() {
        let h = setup();
        h.app.handle(create_batch("b1", "GARISH-RUG", 100, None)).unwrap();
        h.app.handle(create_batch("b2", "GARISH-RUG", 99, None)).unwrap();

        let product = h.storage.load_product(&Sku::new("GARISH-RUG")).unwrap().unwrap();
        assert_eq!(product.batches().len(), 2);
    }

    #[test]
    fn allocate_returns_the_batch_and_updates_the_read_model() {
        let h = setup();
        h.app.handle(create_batch("b1", "COMPLICATED-LAMP", 100, None)).unwrap();

        let handled = h.app.handle(allocate("o1", "COMPLICATED-LAMP", 10)).unwrap();

        assert_eq!(handled.output, Some(Some(BatchRef::new("b1"))));
        assert!(handled.report.is_clean());
        assert_eq!(
            allocations(&h, "o1"),
            vec![AllocationView {
                sku: Sku::new("COMPLICATED-LAMP"),
                batchref: BatchRef::new("b1"),
            }]
        );
        assert_eq!(h.publisher.published_to(LINE_ALLOCATED_CHANNEL).len(), 1);
    }

    #[test]
    fn allocate_errors_for_invalid_sku() {
        let h = setup();
        h.app.handle(create_batch("b1", "AREALSKU", 100, None)).unwrap();

        let err = h.app.handle(allocate("o1", "NONEXISTENTSKU", 10)).unwrap_err();

        assert!(matches!(&err, BusError::Handler(HandlerError::InvalidSku(sku)) if sku.as_str() == "NONEXISTENTSKU"));
        assert_eq!(err.to_string(), "Invalid sku NONEXISTENTSKU");
    }

    #[test]
    fn failed_command_leaves_no_trace() {
        let h = setup();
        h.app.handle(create_batch("b1", "LAMP", 10, None)).unwrap();
        let before = h.storage.snapshot().unwrap();

        assert!(h.app.handle(create_batch("b1", "LAMP", 10, None)).is_err());
        assert!(h.app.handle(allocate("o1", "LAMP", 0)).is_err());

        assert_eq!(h.storage.snapshot().unwrap(), before);
        assert!(h.publisher.published().is_empty());
    }

    #[test]
    fn out_of_stock_sends_a_notification() {
        let h = setup();
        h.app.handle(create_batch("b1", "POPULAR-CURTAINS", 9, None)).unwrap();

        let handled = h.app.handle(allocate("o1", "POPULAR-CURTAINS", 10)).unwrap();

        assert_eq!(handled.output, Some(None));
        assert_eq!(
            h.notifications.sent(),
            vec![("stock@made.com".to_string(), "Out of stock for POPULAR-CURTAINS".to_string())]
        );
    }

    #[test]
    fn change_batch_quantity_reallocates_and_moves_the_read_model() {
        let h = setup();
        let tomorrow = NaiveDate::from_ymd_opt(2030, 1, 2);
        h.app.handle(create_batch("in-stock", "INDIFFERENT-TABLE", 50, None)).unwrap();
        h.app.handle(create_batch("shipment", "INDIFFERENT-TABLE", 50, tomorrow)).unwrap();
        h.app.handle(allocate("o1", "INDIFFERENT-TABLE", 20)).unwrap();
        h.app.handle(allocate("o2", "INDIFFERENT-TABLE", 20)).unwrap();
        h.publisher.clear();

        let handled = h
            .app
            .handle(ChangeBatchQuantity {
                reference: "in-stock".into(),
                qty: 25,
            })
            .unwrap();

        // Deallocated → remove row + reallocate → Allocated → publish + add row
        assert!(handled.report.is_clean());
        assert_eq!(handled.report.messages_processed(), 3);
        assert_eq!(
            handled.report.handlers_invoked(),
            [
                "change_batch_quantity",
                "remove_allocation_from_read_model",
                "reallocate",
                "publish_allocated_event",
                "add_allocation_to_read_model",
            ]
        );

        let product = h.storage.load_product(&Sku::new("INDIFFERENT-TABLE")).unwrap().unwrap();
        assert_eq!(product.batch(&"in-stock".into()).unwrap().available_quantity(), 5);
        assert_eq!(product.batch(&"shipment".into()).unwrap().available_quantity(), 30);

        let published = h.publisher.published_to(LINE_ALLOCATED_CHANNEL);
        assert_eq!(published.len(), 1);
        let AllocationEvent::Allocated(moved) = &published[0] else {
            panic!("expected Allocated, got {:?}", published[0]);
        };
        assert_eq!(moved.batchref, BatchRef::new("shipment"));
        assert_eq!(allocations(&h, moved.orderid.as_str())[0].batchref, BatchRef::new("shipment"));
    }

    #[test]
    fn change_batch_quantity_for_unknown_batch() {
        let h = setup();
        let err = h
            .app
            .handle(ChangeBatchQuantity {
                reference: "ghost".into(),
                qty: 1,
            })
            .unwrap_err();
        assert!(matches!(err, BusError::Handler(HandlerError::UnknownBatch(_))));
    }

    #[test]
    fn publisher_failure_is_isolated_from_the_command() {
        let storage = Arc::new(InMemoryStorage::new());
        let app = Bootstrap::default()
            .without_initializer()
            .with_storage(storage.clone())
            .with_publish(Arc::new(
                |channel: &str, _: &AllocationEvent| -> Result<(), crate::publisher::PublishError> {
                    Err(crate::publisher::PublishError::Broker {
                        channel: channel.to_string(),
                        reason: "down".to_string(),
                    })
                },
            ))
            .build()
            .unwrap();

        app.handle(create_batch("b1", "LAMP", 10, None)).unwrap();
        let handled = app.handle(allocate("o1", "LAMP", 2)).unwrap();

        assert_eq!(handled.output, Some(Some(BatchRef::new("b1"))));
        assert_eq!(handled.report.failures().count(), 1);
        // The sibling read-model handler still ran.
        let mut uow = app.uow();
        assert_eq!(views::allocations(&"o1".into(), uow.as_mut()).unwrap().len(), 1);
    }

    #[test]
    fn losing_a_concurrency_race_is_reported() {
        let h = setup();
        h.app.handle(create_batch("b1", "LAMP", 10, None)).unwrap();

        // Someone else holds a stale copy of the product and commits late.
        let mut stale = StorageUnitOfWork::new(h.storage.clone());
        let mut scope = Scope::enter(&mut stale).unwrap();
        scope.products().get(&Sku::new("LAMP")).unwrap().unwrap();

        h.app.handle(allocate("o1", "LAMP", 1)).unwrap();

        let product = scope.products().get(&Sku::new("LAMP")).unwrap().unwrap();
        product
            .allocate(stockroom_allocation::OrderLine::new("o2", "LAMP", 1))
            .unwrap();
        let err = scope.commit().unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn batch_references_are_unique_across_skus() {
        let h = setup();
        h.app.handle(create_batch("b1", "LAMP", 10, None)).unwrap();

        let err = h.app.handle(create_batch("b1", "CHAIR", 5, None)).unwrap_err();

        assert!(matches!(err, BusError::Handler(HandlerError::Domain(DomainError::Conflict(_)))));
        assert!(h.storage.load_product(&Sku::new("CHAIR")).unwrap().is_none());

        h.app
            .handle(ChangeBatchQuantity {
                reference: "b1".into(),
                qty: 3,
            })
            .unwrap();
        let lamp = h.storage.load_product(&Sku::new("LAMP")).unwrap().unwrap();
        assert_eq!(lamp.batch(&"b1".into()).unwrap().purchased_quantity(), 3);
    }

    #[test]
    fn failed_commit_rolls_back_mutated_products_and_publishes_nothing() {
        let storage = Arc::new(FlakyStorage {
            inner: InMemoryStorage::new(),
            reject_writes: AtomicBool::new(false),
        });
        let publisher = RecordingPublisher::new();
        let app = Bootstrap::default()
            .without_initializer()
            .with_storage(storage.clone())
            .with_publish(publisher.publish_fn())
            .build()
            .unwrap();

        app.handle(create_batch("b1", "LAMP", 10, None)).unwrap();
        app.handle(allocate("o1", "LAMP", 4)).unwrap();
        publisher.clear();
        let before = storage.inner.snapshot().unwrap();
        storage.reject_writes.store(true, Ordering::SeqCst);

        // Both commands change the product in memory before the commit fails.
        let err = app.handle(allocate("o2", "LAMP", 2)).unwrap_err();
        assert!(matches!(err, BusError::Handler(HandlerError::UnitOfWork(UowError::Storage(StorageError::Io(_))))));
        let err = app
            .handle(ChangeBatchQuantity {
                reference: "b1".into(),
                qty: 1,
            })
            .unwrap_err();
        assert!(matches!(err, BusError::Handler(HandlerError::UnitOfWork(_))));

        assert_eq!(storage.inner.snapshot().unwrap(), before);
        assert!(publisher.published().is_empty());

        // Nothing stale lingers in the unit of work once writes succeed again.
        storage.reject_writes.store(false, Ordering::SeqCst);
        let handled = app.handle(allocate("o2", "LAMP", 2)).unwrap();
        assert_eq!(handled.output, Some(Some(BatchRef::new("b1"))));
        let lamp = storage.load_product(&Sku::new("LAMP")).unwrap().unwrap();
        assert_eq!(lamp.batch(&"b1".into()).unwrap().available_quantity(), 4);
        assert_eq!(publisher.published_to(LINE_ALLOCATED_CHANNEL).len(), 1);
    }
}
