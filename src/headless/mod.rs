//! Headless mode - NDJSON event output
//!
//! Every handler callback of the active session becomes one JSON object on
//! stdout, so scripts can follow a result file without parsing a UI.
//!
//! # Event Format
//!
//! Events are output as NDJSON (newline-delimited JSON), one event per line.
//! Each event has an "event" field indicating its type, along with event-specific data.
//!
//! # Example Output
//!
//! ```json
//! {"event":"session_opened","name":"backtest.json","watch":false,"timestamp":1704700001000}
//! {"event":"log","kind":"backtest","time":"2024-03-01T09:31:00Z","message":"Launching analysis","timestamp":1704700001002}
//! {"event":"result","name":"backtest.json","progress":1.0,"result":{...},"timestamp":1704700001003}
//! ```

pub mod runner;

use std::io::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::error;

use rmon_app::{SessionHandler, SessionState};
use rmon_core::{AlgorithmResult, AlgorithmStatus, LogEntry, LogKind, OrderEvent, ResultContext};

/// Events emitted in headless mode
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HeadlessEvent {
    /// A session was opened
    SessionOpened {
        name: String,
        watch: bool,
        timestamp: i64,
    },

    /// The session was closed
    SessionClosed { name: String, timestamp: i64 },

    /// Subscription state changed
    StateChanged { state: SessionState, timestamp: i64 },

    /// Full result snapshot
    Result {
        name: String,
        progress: f64,
        result: AlgorithmResult,
        timestamp: i64,
    },

    /// Log line from the result or its log file
    Log {
        kind: LogKind,
        time: DateTime<Utc>,
        message: String,
        timestamp: i64,
    },

    /// Order event, forwarded verbatim
    OrderEvent { order: Value, timestamp: i64 },

    /// Algorithm status, forwarded verbatim
    Status { status: Value, timestamp: i64 },

    /// A watch-triggered reload failed
    ReloadFailed {
        name: String,
        error: String,
        timestamp: i64,
    },

    /// Error occurred
    Error {
        message: String,
        fatal: bool,
        timestamp: i64,
    },
}

impl HeadlessEvent {
    /// Write this event as one NDJSON line and flush
    pub fn write_to<W: Write>(&self, out: &mut W) {
        let json = match serde_json::to_string(self) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize headless event: {}", e);
                return;
            }
        };

        if let Err(e) = writeln!(out, "{}", json) {
            error!("Failed to write headless event: {}", e);
            return;
        }

        // Flush to ensure immediate output
        if let Err(e) = out.flush() {
            error!("Failed to flush headless output: {}", e);
        }
    }

    /// Get current timestamp in milliseconds
    fn now() -> i64 {
        Utc::now().timestamp_millis()
    }

    pub fn session_opened(name: &str, watch: bool) -> Self {
        Self::SessionOpened {
            name: name.to_string(),
            watch,
            timestamp: Self::now(),
        }
    }

    pub fn session_closed(name: &str) -> Self {
        Self::SessionClosed {
            name: name.to_string(),
            timestamp: Self::now(),
        }
    }

    pub fn state_changed(state: SessionState) -> Self {
        Self::StateChanged {
            state,
            timestamp: Self::now(),
        }
    }

    pub fn result(context: ResultContext) -> Self {
        Self::Result {
            name: context.name,
            progress: context.progress,
            result: context.result,
            timestamp: Self::now(),
        }
    }

    pub fn log(entry: LogEntry) -> Self {
        Self::Log {
            kind: entry.kind,
            time: entry.timestamp,
            message: entry.message,
            timestamp: Self::now(),
        }
    }

    pub fn order_event(event: OrderEvent) -> Self {
        Self::OrderEvent {
            order: event.0,
            timestamp: Self::now(),
        }
    }

    pub fn status(status: AlgorithmStatus) -> Self {
        Self::Status {
            status: status.0,
            timestamp: Self::now(),
        }
    }

    pub fn reload_failed(name: &str, error: &str) -> Self {
        Self::ReloadFailed {
            name: name.to_string(),
            error: error.to_string(),
            timestamp: Self::now(),
        }
    }

    pub fn error(message: String, fatal: bool) -> Self {
        Self::Error {
            message,
            fatal,
            timestamp: Self::now(),
        }
    }
}

/// [`SessionHandler`] that writes every callback as an NDJSON line
#[derive(Debug)]
pub struct NdjsonHandler<W: Write> {
    out: W,
    results: usize,
}

impl<W: Write> NdjsonHandler<W> {
    pub fn new(out: W) -> Self {
        Self { out, results: 0 }
    }

    /// Write an event that did not come from the session
    pub fn write(&mut self, event: HeadlessEvent) {
        event.write_to(&mut self.out);
    }

    /// Number of result snapshots written so far
    pub fn results_written(&self) -> usize {
        self.results
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> SessionHandler for NdjsonHandler<W> {
    fn on_state_changed(&mut self, state: SessionState) {
        self.write(HeadlessEvent::state_changed(state));
    }

    fn on_result(&mut self, context: ResultContext) {
        self.results += 1;
        self.write(HeadlessEvent::result(context));
    }

    fn on_log(&mut self, entry: LogEntry) {
        self.write(HeadlessEvent::log(entry));
    }

    fn on_order_event(&mut self, event: OrderEvent) {
        self.write(HeadlessEvent::order_event(event));
    }

    fn on_status(&mut self, status: AlgorithmStatus) {
        self.write(HeadlessEvent::status(status));
    }

    fn on_reload_failed(&mut self, name: &str, message: &str) {
        self.write(HeadlessEvent::reload_failed(name, message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn to_value(event: &HeadlessEvent) -> Value {
        let json = serde_json::to_string(event).expect("serialization failed");
        serde_json::from_str(&json).expect("invalid JSON")
    }

    #[test]
    fn test_session_opened_serialization() {
        let value = to_value(&HeadlessEvent::session_opened("backtest.json", true));

        assert_eq!(value["event"], "session_opened");
        assert_eq!(value["name"], "backtest.json");
        assert_eq!(value["watch"], true);
        assert!(value["timestamp"].is_number());
    }

    #[test]
    fn test_state_changed_serialization() {
        let value = to_value(&HeadlessEvent::state_changed(SessionState::Subscribed));

        assert_eq!(value["event"], "state_changed");
        assert_eq!(value["state"], "subscribed");
    }

    #[test]
    fn test_log_serialization() {
        let event = HeadlessEvent::log(LogEntry::monitor("Watching live.json"));
        let value = to_value(&event);

        assert_eq!(value["event"], "log");
        assert_eq!(value["kind"], "monitor");
        assert_eq!(value["message"], "Watching live.json");
        assert!(value["time"].is_string());
    }

    #[test]
    fn test_order_event_is_forwarded_verbatim() {
        let order = json!({"orderId": 7, "status": "filled", "fillPrice": 101.5});
        let value = to_value(&HeadlessEvent::order_event(OrderEvent(order.clone())));

        assert_eq!(value["event"], "order_event");
        assert_eq!(value["order"], order);
    }

    #[test]
    fn test_error_serialization() {
        let value = to_value(&HeadlessEvent::error("File not found".to_string(), true));

        assert_eq!(value["event"], "error");
        assert_eq!(value["message"], "File not found");
        assert_eq!(value["fatal"], true);
    }

    #[test]
    fn test_handler_writes_one_line_per_callback() {
        let mut handler = NdjsonHandler::new(Vec::new());
        handler.on_log(LogEntry::monitor("one"));
        handler.on_state_changed(SessionState::Subscribed);
        handler.on_result(ResultContext::completed("a.json", AlgorithmResult::default()));
        handler.on_reload_failed("a.json", "bad JSON");

        assert_eq!(handler.results_written(), 1);
        let output = String::from_utf8(handler.into_inner()).unwrap();
        let events: Vec<String> = output
            .lines()
            .map(|line| {
                let value: Value = serde_json::from_str(line).unwrap();
                value["event"].as_str().unwrap().to_string()
            })
            .collect();
        assert_eq!(events, vec!["log", "state_changed", "result", "reload_failed"]);
    }
}
