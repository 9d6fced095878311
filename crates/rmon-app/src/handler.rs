//! Sink contract for session events.
//!
//! The `SessionHandler` trait is implemented by whatever owns the
//! display: the headless NDJSON writer in the binary, a TUI, or a test
//! recorder.
//!
//! # Delivery Guarantees
//!
//! - Every method runs on the owner context, the thread driving the
//!   [`EventPump`](crate::dispatcher::EventPump). Handlers therefore do not
//!   need to be `Send`.
//! - Calls never overlap and arrive in the order the session emitted them.
//! - A batch (an initial load or a watch-triggered reload) is delivered
//!   completely before the next batch starts.
//!
//! Handlers must return promptly. Anything slow belongs on a separate task.

use rmon_core::{AlgorithmStatus, LogEntry, OrderEvent, ResultContext};

use crate::session::SessionState;

/// Receives typed events from the active session
pub trait SessionHandler {
    /// The session's subscription state changed
    fn on_state_changed(&mut self, state: SessionState);

    /// A full result snapshot was read
    fn on_result(&mut self, context: ResultContext);

    /// A log line was read
    fn on_log(&mut self, entry: LogEntry);

    /// An order event was read
    fn on_order_event(&mut self, event: OrderEvent);

    /// The algorithm status changed
    fn on_status(&mut self, status: AlgorithmStatus);

    /// A watch-triggered reload failed. The session keeps watching and
    /// retries on the next change.
    fn on_reload_failed(&mut self, _name: &str, _message: &str) {}
}

/// Handler that records every call, for tests
#[cfg(any(test, feature = "test-helpers"))]
#[derive(Debug, Default)]
pub struct RecordingHandler {
    pub events: Vec<crate::event::SessionEvent>,
    pub threads: Vec<std::thread::ThreadId>,
}

#[cfg(any(test, feature = "test-helpers"))]
impl RecordingHandler {
    fn record(&mut self, event: crate::event::SessionEvent) {
        self.threads.push(std::thread::current().id());
        self.events.push(event);
    }

    /// Event type labels in delivery order
    pub fn labels(&self) -> Vec<&'static str> {
        self.events.iter().map(|e| e.event_type()).collect()
    }

    pub fn states(&self) -> Vec<SessionState> {
        self.events
            .iter()
            .filter_map(|e| match e {
                crate::event::SessionEvent::StateChanged(state) => Some(*state),
                _ => None,
            })
            .collect()
    }

    pub fn results(&self) -> Vec<&ResultContext> {
        self.events
            .iter()
            .filter_map(|e| match e {
                crate::event::SessionEvent::Result(context) => Some(context),
                _ => None,
            })
            .collect()
    }

    pub fn log_messages(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                crate::event::SessionEvent::Log(entry) => Some(entry.message.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.events.clear();
        self.threads.clear();
    }
}

#[cfg(any(test, feature = "test-helpers"))]
impl SessionHandler for RecordingHandler {
    fn on_state_changed(&mut self, state: SessionState) {
        self.record(crate::event::SessionEvent::StateChanged(state));
    }

    fn on_result(&mut self, context: ResultContext) {
        self.record(crate::event::SessionEvent::Result(context));
    }

    fn on_log(&mut self, entry: LogEntry) {
        self.record(crate::event::SessionEvent::Log(entry));
    }

    fn on_order_event(&mut self, event: OrderEvent) {
        self.record(crate::event::SessionEvent::OrderEvent(event));
    }

    fn on_status(&mut self, status: AlgorithmStatus) {
        self.record(crate::event::SessionEvent::Status(status));
    }

    fn on_reload_failed(&mut self, name: &str, message: &str) {
        self.record(crate::event::SessionEvent::ReloadFailed {
            name: name.to_string(),
            message: message.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MinimalHandler {
        states: usize,
    }

    impl SessionHandler for MinimalHandler {
        fn on_state_changed(&mut self, _state: SessionState) {
            self.states += 1;
        }
        fn on_result(&mut self, _context: ResultContext) {}
        fn on_log(&mut self, _entry: LogEntry) {}
        fn on_order_event(&mut self, _event: OrderEvent) {}
        fn on_status(&mut self, _status: AlgorithmStatus) {}
    }

    #[test]
    fn test_reload_failed_defaults_to_noop() {
        let mut handler = MinimalHandler { states: 0 };
        handler.on_reload_failed("backtest.json", "unexpected EOF");
        handler.on_state_changed(SessionState::Subscribed);
        assert_eq!(handler.states, 1);
    }

    #[test]
    fn test_recording_handler_tracks_threads() {
        let mut handler = RecordingHandler::default();
        handler.on_state_changed(SessionState::Subscribed);
        handler.on_state_changed(SessionState::Unsubscribed);

        assert_eq!(
            handler.states(),
            vec![SessionState::Subscribed, SessionState::Unsubscribed]
        );
        assert!(handler
            .threads
            .iter()
            .all(|id| *id == std::thread::current().id()));

        handler.clear();
        assert!(handler.events.is_empty());
    }
}
