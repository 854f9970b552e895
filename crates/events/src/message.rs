use crate::{Command, Event};

/// Anything the bus can route: a command or an event.
///
/// A closed sum type so dispatch is an exhaustive `match` rather than
/// runtime type inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message<C, E> {
    Command(C),
    Event(E),
}

impl<C: Command, E: Event> Message<C, E> {
    /// Routing name of the wrapped command or event.
    pub fn message_type(&self) -> &'static str {
        match self {
            Message::Command(c) => c.command_type(),
            Message::Event(e) => e.event_type(),
        }
    }

    pub fn is_command(&self) -> bool {
        matches!(self, Message::Command(_))
    }

    pub fn is_event(&self) -> bool {
        matches!(self, Message::Event(_))
    }
}
