//! Composition root: wires handlers to their dependencies.
//!
//! ```ignore
//! let app = Bootstrap::new(Settings::from_env()).build()?;
//! app.handle(CreateBatch { .. })?;
//! ```
//!
//! Every dependency has a default and an independent `with_*` override, so
//! tests replace exactly what they need. Each `build()` returns a fresh
//! [`App`]; nothing is registered globally.

use std::sync::Arc;

use thiserror::Error;

use stockroom_allocation::{AllocationCommand, AllocationEvent, AllocationMessage};
use stockroom_core::BatchRef;
use stockroom_events::{
    Broker, BusError, Command, Event, Handled, HandlerRegistry, InMemoryBroker, MessageBus, RegistryError, Routing,
};

use crate::config::Settings;
use crate::handlers::{self, HandlerError};
use crate::notifications::{Notifications, TracingNotifications};
use crate::publisher::{Publish, broker_publisher};
use crate::storage::{InMemoryStorage, JsonFileStorage, Storage, StorageError};
use crate::unit_of_work::{StorageUnitOfWork, UnitOfWork};

/// Message and unit-of-work types of the allocation bus.
#[derive(Debug, Clone, Copy)]
pub struct AllocationRouting;

impl Routing for AllocationRouting {
    type Command = AllocationCommand;
    type Event = AllocationEvent;
    type Uow = dyn UnitOfWork;
    type Output = Option<BatchRef>;
    type Error = HandlerError;
}

pub type AllocationBus = MessageBus<AllocationRouting>;

/// Error of a top-level `App::handle` call.
pub type AppError = BusError<HandlerError>;

/// Creates a fresh unit of work per top-level message.
pub type UowFactory = Arc<dyn Fn() -> Box<dyn UnitOfWork> + Send + Sync>;

/// Runs once per `build()`, before any message is handled.
pub type Initializer = Arc<dyn Fn() -> Result<(), BootstrapError> + Send + Sync>;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("storage initialization failed: {0}")]
    Storage(#[from] StorageError),

    #[error("initializer failed: {0}")]
    Initializer(String),
}

/// Dependency configuration for an [`App`].
pub struct Bootstrap {
    settings: Settings,
    storage: Option<Arc<dyn Storage>>,
    initializer: Option<Initializer>,
    uow_factory: Option<UowFactory>,
    publish: Option<Publish>,
    notifications: Option<Arc<dyn Notifications>>,
}

impl Default for Bootstrap {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl Bootstrap {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            storage: None,
            initializer: None,
            uow_factory: None,
            publish: None,
            notifications: None,
        }
    }

    pub fn from_env() -> Self {
        Self::new(Settings::from_env())
    }

    /// Backend for the default initializer and unit-of-work factory.
    pub fn with_storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn with_initializer<F>(mut self, initializer: F) -> Self
    where
        F: Fn() -> Result<(), BootstrapError> + Send + Sync + 'static,
    {
        self.initializer = Some(Arc::new(initializer));
        self
    }

    /// Skip initialization entirely (no logging setup, no storage init).
    pub fn without_initializer(self) -> Self {
        self.with_initializer(|| Ok(()))
    }

    pub fn with_uow_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Box<dyn UnitOfWork> + Send + Sync + 'static,
    {
        self.uow_factory = Some(Arc::new(factory));
        self
    }

    pub fn with_publish(mut self, publish: Publish) -> Self {
        self.publish = Some(publish);
        self
    }

    /// Publish through `broker` instead of the in-process default.
    pub fn with_broker<B>(self, broker: B) -> Self
    where
        B: Broker<String> + 'static,
    {
        self.with_publish(broker_publisher(broker))
    }

    pub fn with_notifications(mut self, notifications: Arc<dyn Notifications>) -> Self {
        self.notifications = Some(notifications);
        self
    }

    /// Resolve defaults, run the initializer and register every handler.
    pub fn build(self) -> Result<App, BootstrapError> {
        let storage = self.storage.unwrap_or_else(|| default_storage(&self.settings));

        let initializer = self.initializer.unwrap_or_else(|| default_initializer(Arc::clone(&storage)));
        initializer()?;

        let uow_factory = self.uow_factory.unwrap_or_else(|| {
            let storage = Arc::clone(&storage);
            let factory: UowFactory =
                Arc::new(move || Box::new(StorageUnitOfWork::new(Arc::clone(&storage))) as Box<dyn UnitOfWork>);
            factory
        });

        let mut local_broker = None;
        let publish = self.publish.unwrap_or_else(|| {
            let broker = Arc::new(InMemoryBroker::<String>::new());
            local_broker = Some(Arc::clone(&broker));
            broker_publisher(broker)
        });

        let notifications = self
            .notifications
            .unwrap_or_else(|| Arc::new(TracingNotifications) as Arc<dyn Notifications>);

        let registry = register_handlers(publish, notifications, self.settings.notification_recipient.clone())?;

        tracing::debug!(
            commands = registry.command_types().count(),
            events = registry.event_types().count(),
            "message bus bootstrapped"
        );

        Ok(App {
            bus: Arc::new(MessageBus::new(registry)),
            uow_factory,
            local_broker,
            settings: Arc::new(self.settings),
        })
    }
}

fn default_storage(settings: &Settings) -> Arc<dyn Storage> {
    match &settings.data_path {
        Some(path) => Arc::new(JsonFileStorage::new(path.clone())),
        None => Arc::new(InMemoryStorage::new()),
    }
}

fn default_initializer(storage: Arc<dyn Storage>) -> Initializer {
    Arc::new(move || -> Result<(), BootstrapError> {
        stockroom_observability::init();
        storage.init()?;
        Ok(())
    })
}

/// The handler table of the allocation service.
fn register_handlers(
    publish: Publish,
    notifications: Arc<dyn Notifications>,
    recipient: String,
) -> Result<HandlerRegistry<AllocationRouting>, RegistryError> {
    let mut registry = HandlerRegistry::<AllocationRouting>::new();

    registry
        .register_command(AllocationCommand::CREATE_BATCH, "add_batch", |command, uow| match command {
            AllocationCommand::CreateBatch(cmd) => handlers::add_batch(cmd, uow).map(|()| None),
            other => Err(HandlerError::Misrouted(other.command_type())),
        })?
        .register_command(AllocationCommand::ALLOCATE, "allocate", |command, uow| match command {
            AllocationCommand::Allocate(cmd) => handlers::allocate(cmd, uow),
            other => Err(HandlerError::Misrouted(other.command_type())),
        })?
        .register_command(
            AllocationCommand::CHANGE_BATCH_QUANTITY,
            "change_batch_quantity",
            |command, uow| match command {
                AllocationCommand::ChangeBatchQuantity(cmd) => {
                    handlers::change_batch_quantity(cmd, uow).map(|()| None)
                }
                other => Err(HandlerError::Misrouted(other.command_type())),
            },
        )?;

    registry
        .register_event(AllocationEvent::ALLOCATED, "publish_allocated_event", move |event, _uow| {
            match event {
                AllocationEvent::Allocated(e) => handlers::publish_allocated_event(e, &publish),
                other => Err(HandlerError::Misrouted(other.event_type())),
            }
        })
        .register_event(AllocationEvent::ALLOCATED, "add_allocation_to_read_model", |event, uow| {
            match event {
                AllocationEvent::Allocated(e) => handlers::add_allocation_to_read_model(e, uow),
                other => Err(HandlerError::Misrouted(other.event_type())),
            }
        })
        .register_event(
            AllocationEvent::DEALLOCATED,
            "remove_allocation_from_read_model",
            |event, uow| match event {
                AllocationEvent::Deallocated(e) => handlers::remove_allocation_from_read_model(e, uow),
                other => Err(HandlerError::Misrouted(other.event_type())),
            },
        )
        .register_event(AllocationEvent::DEALLOCATED, "reallocate", |event, uow| match event {
            AllocationEvent::Deallocated(e) => handlers::reallocate(e, uow),
            other => Err(HandlerError::Misrouted(other.event_type())),
        })
        .register_event(
            AllocationEvent::OUT_OF_STOCK,
            "send_out_of_stock_notification",
            move |event, _uow| match event {
                AllocationEvent::OutOfStock(e) => {
                    handlers::send_out_of_stock_notification(e, notifications.as_ref(), &recipient)
                }
                other => Err(HandlerError::Misrouted(other.event_type())),
            },
        );

    Ok(registry)
}

/// A bootstrapped allocation service: message bus plus unit-of-work factory.
///
/// Cheap to clone; clones share the bus and dependencies.
#[derive(Clone)]
pub struct App {
    bus: Arc<AllocationBus>,
    uow_factory: UowFactory,
    local_broker: Option<Arc<InMemoryBroker<String>>>,
    settings: Arc<Settings>,
}

impl App {
    /// Dispatch `message` in a fresh unit of work.
    pub fn handle(&self, message: impl Into<AllocationMessage>) -> Result<Handled<Option<BatchRef>>, AppError> {
        let mut uow = self.uow();
        self.handle_with(message, uow.as_mut())
    }

    /// Dispatch `message` in a caller-provided unit of work.
    pub fn handle_with(
        &self,
        message: impl Into<AllocationMessage>,
        uow: &mut (dyn UnitOfWork + 'static),
    ) -> Result<Handled<Option<BatchRef>>, AppError> {
        self.bus.handle(message.into(), uow)
    }

    pub fn uow(&self) -> Box<dyn UnitOfWork> {
        (self.uow_factory)()
    }

    pub fn bus(&self) -> &AllocationBus {
        &self.bus
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The in-process broker events are published to when no publisher
    /// override was given.
    pub fn local_broker(&self) -> Option<&Arc<InMemoryBroker<String>>> {
        self.local_broker.as_ref()
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("registry", self.bus.registry())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
