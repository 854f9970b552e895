/// A domain event: an immutable fact, broadcast to zero or more handlers.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name used for routing (e.g. `"Allocated"`).
    fn event_type(&self) -> &'static str;

    /// Schema version for this event type.
    fn version(&self) -> u32 {
        1
    }
}

/// Source of events raised by domain objects during handler execution.
///
/// Implemented by units of work. The bus calls this after every handler
/// invocation and appends the result to its queue.
pub trait CollectEvents<E> {
    /// Drain and return pending events in the order they were raised.
    ///
    /// A second call returns nothing until new domain activity appends more
    /// events.
    fn collect_new_events(&mut self) -> Vec<E>;
}
