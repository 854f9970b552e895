/// A command: an imperative request with exactly one logical recipient.
///
/// ## Command vs Event
///
/// - **Command**: intent to do something ("allocate 3 lamps to order 7").
///   Exactly one handler; if it fails, the sender hears about it.
/// - **Event**: fact that something happened ("3 lamps were allocated").
///   Zero or more listeners; a failing listener never affects the others or
///   the sender.
///
/// Commands must be cloneable, thread-safe and own their data so they can
/// be queued, logged and retried.
pub trait Command: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable command name used for routing (e.g. `"Allocate"`).
    fn command_type(&self) -> &'static str;
}
