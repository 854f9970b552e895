//! Per-handler outcome capture for one top-level dispatch.

/// Result of a single handler invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerOutcome {
    /// Command or event type the handler was invoked for.
    pub message_type: &'static str,
    /// Registered handler name.
    pub handler: &'static str,
    /// `Some(error text)` if the handler failed.
    pub failure: Option<String>,
}

impl HandlerOutcome {
    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }
}

/// Everything that ran while draining one top-level message.
///
/// Event handler failures never abort dispatch; they land here (and in the
/// logs) so callers and tests can still see them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    outcomes: Vec<HandlerOutcome>,
    messages_processed: usize,
}

impl DispatchReport {
    pub(crate) fn message_processed(&mut self) {
        self.messages_processed += 1;
    }

    pub(crate) fn record(&mut self, message_type: &'static str, handler: &'static str, failure: Option<String>) {
        self.outcomes.push(HandlerOutcome {
            message_type,
            handler,
            failure,
        });
    }

    /// Outcomes in invocation order.
    pub fn outcomes(&self) -> &[HandlerOutcome] {
        &self.outcomes
    }

    pub fn failures(&self) -> impl Iterator<Item = &HandlerOutcome> {
        self.outcomes.iter().filter(|o| !o.succeeded())
    }

    pub fn is_clean(&self) -> bool {
        self.outcomes.iter().all(HandlerOutcome::succeeded)
    }

    /// Number of messages taken off the queue, the top-level one included.
    pub fn messages_processed(&self) -> usize {
        self.messages_processed
    }

    /// Handler names in invocation order.
    pub fn handlers_invoked(&self) -> Vec<&'static str> {
        self.outcomes.iter().map(|o| o.handler).collect()
    }
}
