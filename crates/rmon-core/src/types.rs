//! Core domain type definitions

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Where a log entry originated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    /// Log line recorded by the algorithm during a backtest
    Backtest,
    /// Log line streamed from a live deployment
    Live,
    /// Message produced by the monitor itself
    Monitor,
}

impl LogKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            LogKind::Backtest => "backtest",
            LogKind::Live => "live",
            LogKind::Monitor => "monitor",
        }
    }
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// A raw `(timestamp, message)` pair as stored in a result file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
    pub time: DateTime<Utc>,
    pub message: String,
}

impl LogLine {
    pub fn new(time: DateTime<Utc>, message: impl Into<String>) -> Self {
        Self {
            time,
            message: message.into(),
        }
    }
}

/// A log entry delivered to the session handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub kind: LogKind,
}

impl LogEntry {
    pub fn new(timestamp: DateTime<Utc>, message: impl Into<String>, kind: LogKind) -> Self {
        Self {
            timestamp,
            message: message.into(),
            kind,
        }
    }

    /// Wrap a line read from a backtest result
    pub fn backtest(line: LogLine) -> Self {
        Self::new(line.time, line.message, LogKind::Backtest)
    }

    /// A monitor-generated entry stamped with the current time
    pub fn monitor(message: impl Into<String>) -> Self {
        Self::new(Utc::now(), message, LogKind::Monitor)
    }

    /// Format for single-line display
    pub fn display_line(&self) -> String {
        format!(
            "{} [{}] {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.kind.prefix(),
            self.message
        )
    }
}

/// An order event, forwarded to the handler verbatim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderEvent(pub Value);

/// Algorithm status payload, forwarded to the handler verbatim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlgorithmStatus(pub Value);

/// Decoded result of an algorithm run
///
/// Only the fields the monitor routes are typed; everything else the
/// runtime writes (charts, holdings, runtime statistics) is kept in
/// `extra` so a decode followed by an encode is lossless.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlgorithmResult {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub logs: Vec<LogLine>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order_events: Vec<OrderEvent>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub statistics: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AlgorithmStatus>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Snapshot of what is currently known about a source
#[derive(Debug, Clone, PartialEq)]
pub struct ResultContext {
    pub name: String,
    pub result: AlgorithmResult,
    /// Completion in `[0, 1]`
    pub progress: f64,
}

impl ResultContext {
    /// Create a context, clamping `progress` into `[0, 1]`
    pub fn new(name: impl Into<String>, result: AlgorithmResult, progress: f64) -> Self {
        let progress = if progress.is_nan() {
            0.0
        } else {
            progress.clamp(0.0, 1.0)
        };
        Self {
            name: name.into(),
            result,
            progress,
        }
    }

    /// Context for a fully read source
    pub fn completed(name: impl Into<String>, result: AlgorithmResult) -> Self {
        Self::new(name, result, 1.0)
    }

    pub fn is_complete(&self) -> bool {
        self.progress >= 1.0
    }
}
