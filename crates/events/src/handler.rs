//! Handler registry: message type -> handler(s).

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::{CollectEvents, Command, Event};

/// Type-level description of what a bus routes.
///
/// - `Command` / `Event`: the application's closed message enums
/// - `Uow`: the unit of work handed to every handler (usually a trait object)
/// - `Output`: what a command handler returns to the original caller
/// - `Error`: handler failure type, propagated verbatim for commands
pub trait Routing: 'static {
    type Command: Command;
    type Event: Event;
    type Uow: ?Sized + CollectEvents<Self::Event>;
    type Output;
    type Error: std::error::Error + Send + Sync + 'static;
}

type CommandFn<R> = dyn Fn(
        &<R as Routing>::Command,
        &mut <R as Routing>::Uow,
    ) -> Result<<R as Routing>::Output, <R as Routing>::Error>
    + Send
    + Sync;

type EventFn<R> = dyn Fn(&<R as Routing>::Event, &mut <R as Routing>::Uow) -> Result<(), <R as Routing>::Error>
    + Send
    + Sync;

/// The single handler bound to a command type.
pub struct CommandHandler<R: Routing> {
    name: &'static str,
    func: Arc<CommandFn<R>>,
}

impl<R: Routing> CommandHandler<R> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn call(&self, command: &R::Command, uow: &mut R::Uow) -> Result<R::Output, R::Error> {
        (self.func)(command, uow)
    }
}

impl<R: Routing> Clone for CommandHandler<R> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            func: Arc::clone(&self.func),
        }
    }
}

impl<R: Routing> core::fmt::Debug for CommandHandler<R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CommandHandler").field("name", &self.name).finish()
    }
}

/// One of the (ordered) handlers bound to an event type.
pub struct EventHandler<R: Routing> {
    name: &'static str,
    func: Arc<EventFn<R>>,
}

impl<R: Routing> EventHandler<R> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn call(&self, event: &R::Event, uow: &mut R::Uow) -> Result<(), R::Error> {
        (self.func)(event, uow)
    }
}

impl<R: Routing> Clone for EventHandler<R> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            func: Arc::clone(&self.func),
        }
    }
}

impl<R: Routing> core::fmt::Debug for EventHandler<R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EventHandler").field("name", &self.name).finish()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("command `{command_type}` already handled by `{existing}`")]
    DuplicateCommandHandler {
        command_type: &'static str,
        existing: &'static str,
    },
}

/// Static mapping from message type to handlers.
///
/// Commands map to exactly one handler. Events map to an ordered list that
/// may be empty; handlers run in registration order.
pub struct HandlerRegistry<R: Routing> {
    commands: HashMap<&'static str, CommandHandler<R>>,
    events: HashMap<&'static str, Vec<EventHandler<R>>>,
}

impl<R: Routing> HandlerRegistry<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the handler for `command_type`.
    ///
    /// Fails if the command type already has a handler.
    pub fn register_command<F>(
        &mut self,
        command_type: &'static str,
        name: &'static str,
        handler: F,
    ) -> Result<&mut Self, RegistryError>
    where
        F: Fn(&R::Command, &mut R::Uow) -> Result<R::Output, R::Error> + Send + Sync + 'static,
    {
        if let Some(existing) = self.commands.get(command_type) {
            return Err(RegistryError::DuplicateCommandHandler {
                command_type,
                existing: existing.name,
            });
        }
        self.commands.insert(
            command_type,
            CommandHandler {
                name,
                func: Arc::new(handler),
            },
        );
        Ok(self)
    }

    /// Append a handler to the list for `event_type`.
    pub fn register_event<F>(&mut self, event_type: &'static str, name: &'static str, handler: F) -> &mut Self
    where
        F: Fn(&R::Event, &mut R::Uow) -> Result<(), R::Error> + Send + Sync + 'static,
    {
        self.events.entry(event_type).or_default().push(EventHandler {
            name,
            func: Arc::new(handler),
        });
        self
    }

    pub fn command_handler(&self, command_type: &str) -> Option<&CommandHandler<R>> {
        self.commands.get(command_type)
    }

    /// Handlers for `event_type` in registration order (empty if none).
    pub fn event_handlers(&self, event_type: &str) -> &[EventHandler<R>] {
        self.events.get(event_type).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn command_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.commands.keys().copied()
    }

    pub fn event_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.events.keys().copied()
    }
}

impl<R: Routing> Default for HandlerRegistry<R> {
    fn default() -> Self {
        Self {
            commands: HashMap::new(),
            events: HashMap::new(),
        }
    }
}

impl<R: Routing> Clone for HandlerRegistry<R> {
    fn clone(&self) -> Self {
        Self {
            commands: self.commands.clone(),
            events: self.events.clone(),
        }
    }
}

impl<R: Routing> core::fmt::Debug for HandlerRegistry<R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("commands", &self.commands)
            .field("events", &self.events)
            .finish()
    }
}
