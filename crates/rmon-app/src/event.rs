//! Events a session publishes to its owner context
//!
//! A session never calls its handler directly. It posts batches of
//! [`SessionEvent`] through its [`Dispatcher`](crate::dispatcher::Dispatcher);
//! the owner's [`EventPump`](crate::dispatcher::EventPump) turns each one
//! into the matching [`SessionHandler`] call.

use rmon_core::{AlgorithmStatus, LogEntry, OrderEvent, ResultContext};

use crate::handler::SessionHandler;
use crate::session::SessionState;

/// One typed notification from a session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Subscription state changed
    StateChanged(SessionState),

    /// Full result snapshot; supersedes any earlier one for the session
    Result(ResultContext),

    /// A single log line
    Log(LogEntry),

    /// An order event, verbatim
    OrderEvent(OrderEvent),

    /// Algorithm status, verbatim
    Status(AlgorithmStatus),

    /// A watch-triggered reload failed; the subscription is still alive
    ReloadFailed { name: String, message: String },
}

impl SessionEvent {
    /// Returns a short string label for this event type (for logging/debugging).
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::StateChanged(_) => "state_changed",
            Self::Result(_) => "result",
            Self::Log(_) => "log",
            Self::OrderEvent(_) => "order_event",
            Self::Status(_) => "status",
            Self::ReloadFailed { .. } => "reload_failed",
        }
    }

    /// Hand this event to the matching handler method
    pub fn deliver<H: SessionHandler + ?Sized>(self, handler: &mut H) {
        match self {
            Self::StateChanged(state) => handler.on_state_changed(state),
            Self::Result(context) => handler.on_result(context),
            Self::Log(entry) => handler.on_log(entry),
            Self::OrderEvent(event) => handler.on_order_event(event),
            Self::Status(status) => handler.on_status(status),
            Self::ReloadFailed { name, message } => handler.on_reload_failed(&name, &message),
        }
    }
}
