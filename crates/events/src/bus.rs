//! Synchronous message bus (dispatcher).
//!
//! ## Dispatch flow
//!
//! ```text
//! handle(message, uow)
//!   ↓
//! queue = [message]
//!   ↓
//! pop front ──► Command ──► exactly one handler ──► error? propagate (fail noisily)
//!   │                                              └► ok: keep output if top-level
//!   └────────► Event ────► each handler in order ─► error? record + log, continue
//!   ↓
//! after every handler: uow.collect_new_events() → push back onto queue
//!   ↓
//! repeat until queue is empty
//! ```
//!
//! Messages are processed strictly FIFO: events raised by a handler are
//! appended behind whatever is already queued. The bus keeps no state
//! between calls.

use std::collections::VecDeque;

use thiserror::Error;

use crate::handler::{HandlerRegistry, Routing};
use crate::report::DispatchReport;
use crate::{CollectEvents, Command, Event, Message};

/// Failure of a top-level `handle` call.
#[derive(Debug, Error)]
pub enum BusError<H> {
    /// A command type has no registered handler.
    #[error("no handler registered for command `{0}`")]
    UnregisteredCommand(&'static str),

    /// The command handler failed; the handler's own error, untouched.
    #[error(transparent)]
    Handler(H),
}

impl<H> BusError<H> {
    pub fn handler_error(&self) -> Option<&H> {
        match self {
            BusError::Handler(e) => Some(e),
            BusError::UnregisteredCommand(_) => None,
        }
    }

    pub fn into_handler_error(self) -> Option<H> {
        match self {
            BusError::Handler(e) => Some(e),
            BusError::UnregisteredCommand(_) => None,
        }
    }
}

/// Successful result of a top-level `handle` call.
#[derive(Debug)]
pub struct Handled<O> {
    /// Output of the command handler when the top-level message was a
    /// command; always `None` for events.
    pub output: Option<O>,
    pub report: DispatchReport,
}

impl<O> Handled<O> {
    pub fn into_output(self) -> Option<O> {
        self.output
    }
}

/// Routes commands and events to registered handlers.
///
/// - **Commands** have exactly one handler. Its error aborts the dispatch and
///   is returned to the caller; its output is returned on success.
/// - **Events** have zero or more handlers, run in registration order. A
///   failing handler is logged and recorded in the [`DispatchReport`]; the
///   remaining handlers and queued messages still run.
pub struct MessageBus<R: Routing> {
    registry: HandlerRegistry<R>,
}

impl<R: Routing> MessageBus<R> {
    pub fn new(registry: HandlerRegistry<R>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &HandlerRegistry<R> {
        &self.registry
    }

    /// Dispatch `message` and everything it transitively raises.
    ///
    /// Returns once the internal queue is empty.
    pub fn handle(
        &self,
        message: Message<R::Command, R::Event>,
        uow: &mut R::Uow,
    ) -> Result<Handled<R::Output>, BusError<R::Error>> {
        let mut queue = VecDeque::from([message]);
        let mut report = DispatchReport::default();
        let mut output = None;

        while let Some(message) = queue.pop_front() {
            report.message_processed();
            match message {
                Message::Command(command) => {
                    let result = self.handle_command(&command, uow, &mut queue, &mut report)?;
                    // Handlers only raise events, so the only command ever
                    // dequeued is the top-level one.
                    output = Some(result);
                }
                Message::Event(event) => self.handle_event(&event, uow, &mut queue, &mut report),
            }
        }

        Ok(Handled { output, report })
    }

    fn handle_command(
        &self,
        command: &R::Command,
        uow: &mut R::Uow,
        queue: &mut VecDeque<Message<R::Command, R::Event>>,
        report: &mut DispatchReport,
    ) -> Result<R::Output, BusError<R::Error>> {
        let command_type = command.command_type();
        let handler = self
            .registry
            .command_handler(command_type)
            .ok_or(BusError::UnregisteredCommand(command_type))?;

        tracing::debug!(command = command_type, handler = handler.name(), "handling command");

        match handler.call(command, uow) {
            Ok(result) => {
                report.record(command_type, handler.name(), None);
                enqueue_new_events::<R>(uow, queue);
                Ok(result)
            }
            Err(e) => {
                tracing::debug!(command = command_type, handler = handler.name(), error = %e, "command handler failed");
                Err(BusError::Handler(e))
            }
        }
    }

    fn handle_event(
        &self,
        event: &R::Event,
        uow: &mut R::Uow,
        queue: &mut VecDeque<Message<R::Command, R::Event>>,
        report: &mut DispatchReport,
    ) {
        let event_type = event.event_type();
        let handlers = self.registry.event_handlers(event_type);
        if handlers.is_empty() {
            tracing::debug!(event = event_type, "no handlers registered for event");
            return;
        }

        for handler in handlers {
            tracing::debug!(event = event_type, handler = handler.name(), "handling event");
            match handler.call(event, uow) {
                Ok(()) => report.record(event_type, handler.name(), None),
                Err(e) => {
                    tracing::error!(event = event_type, handler = handler.name(), error = %e, "event handler failed");
                    report.record(event_type, handler.name(), Some(e.to_string()));
                }
            }
            enqueue_new_events::<R>(uow, queue);
        }
    }
}

impl<R: Routing> core::fmt::Debug for MessageBus<R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MessageBus")
            .field("registry", &self.registry)
            .finish()
    }
}

fn enqueue_new_events<R: Routing>(uow: &mut R::Uow, queue: &mut VecDeque<Message<R::Command, R::Event>>) {
    queue.extend(uow.collect_new_events().into_iter().map(Message::Event));
}
