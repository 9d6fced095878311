//! Result decoding contract and the JSON implementation
//!
//! The session layer only depends on [`ResultSerializer`]. The JSON
//! decoder here reads the result files the algorithm runtime writes
//! (`<id>.json`) plus the optional plain-text log it drops next to them
//! (`<id>-log.txt`).

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::{Error, Result};
use crate::types::{AlgorithmResult, LogLine};

/// Suffix of the plain-text log written next to a result file
pub const LOG_FILE_SUFFIX: &str = "-log.txt";

const PLAIN_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Decodes a result source into domain types.
///
/// Implementations are called from background threads (blocking read
/// tasks and watcher callbacks), hence `Send + Sync`.
pub trait ResultSerializer: Send + Sync + fmt::Debug {
    /// Decode the aggregate result stored at `path`
    fn deserialize(&self, path: &Path) -> Result<AlgorithmResult>;

    /// Backtest log lines recorded for `path`, oldest first
    fn backtest_logs(&self, path: &Path) -> Result<Vec<LogLine>>;
}

/// serde_json-backed [`ResultSerializer`]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonResultSerializer;

impl JsonResultSerializer {
    pub fn new() -> Self {
        Self
    }

    /// Encode a result the way [`deserialize`](ResultSerializer::deserialize) reads it
    pub fn serialize(&self, result: &AlgorithmResult) -> Result<String> {
        Ok(serde_json::to_string_pretty(result)?)
    }
}

impl ResultSerializer for JsonResultSerializer {
    fn deserialize(&self, path: &Path) -> Result<AlgorithmResult> {
        let content = read_source(path)?;
        serde_json::from_str(&content).map_err(|e| Error::decode(path, e.to_string()))
    }

    /// Reads the sibling `<stem>-log.txt`; a missing log file yields no lines
    fn backtest_logs(&self, path: &Path) -> Result<Vec<LogLine>> {
        let log_path = log_file_for(path);
        match std::fs::read_to_string(&log_path) {
            Ok(content) => Ok(parse_log_lines(&content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Read a source file, mapping a missing file to [`Error::SourceNotFound`]
fn read_source(path: &Path) -> Result<String> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::source_not_found(path)),
        Err(e) => Err(e.into()),
    }
}

/// Path of the plain-text log belonging to a result file
pub fn log_file_for(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{}{}", stem, LOG_FILE_SUFFIX))
}

/// Parse a plain-text log, one entry per non-empty line.
///
/// Lines start with either an RFC 3339 timestamp or `YYYY-MM-DD HH:MM:SS`.
/// A line without a timestamp is a continuation and reuses the previous
/// line's time.
pub fn parse_log_lines(content: &str) -> Vec<LogLine> {
    let mut last = DateTime::<Utc>::default();
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| match split_timestamp(line) {
            Some((time, message)) => {
                last = time;
                LogLine::new(time, message)
            }
            None => LogLine::new(last, line.trim_end()),
        })
        .collect()
}

fn split_timestamp(line: &str) -> Option<(DateTime<Utc>, &str)> {
    let mut parts = line.splitn(3, ' ');
    let first = parts.next()?;

    if let Ok(time) = DateTime::parse_from_rfc3339(first) {
        let message = line[first.len()..].trim();
        return Some((time.with_timezone(&Utc), message));
    }

    let second = parts.next()?;
    let stamp = &line[..first.len() + 1 + second.len()];
    let time = NaiveDateTime::parse_from_str(stamp, PLAIN_TIMESTAMP_FORMAT).ok()?;
    Some((time.and_utc(), line[stamp.len()..].trim()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_deserialize_missing_file_is_source_not_found() {
        let temp = TempDir::new().unwrap();
        let err = JsonResultSerializer
            .deserialize(&temp.path().join("absent.json"))
            .unwrap_err();
        assert!(matches!(err, Error::SourceNotFound { .. }));
    }

    #[test]
    fn test_deserialize_invalid_json_is_decode_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("broken.json");
        std::fs::write(&path, "{ \"orderEvents\": [").unwrap();

        let err = JsonResultSerializer.deserialize(&path).unwrap_err();
        match err {
            Error::Decode { path: p, .. } => assert_eq!(p, path),
            other => panic!("expected decode error, got {:?}", other),
        }
    }

    #[test]
    fn test_serialize_then_deserialize() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("result.json");
        let mut result = AlgorithmResult::default();
        result
            .statistics
            .insert("Total Trades".to_string(), "2".to_string());

        let serializer = JsonResultSerializer::new();
        std::fs::write(&path, serializer.serialize(&result).unwrap()).unwrap();

        assert_eq!(serializer.deserialize(&path).unwrap(), result);
    }

    #[test]
    fn test_log_file_for() {
        assert_eq!(
            log_file_for(Path::new("/data/1234.json")),
            PathBuf::from("/data/1234-log.txt")
        );
        assert_eq!(
            log_file_for(Path::new("backtest.json")),
            PathBuf::from("backtest-log.txt")
        );
    }

    #[test]
    fn test_backtest_logs_without_log_file() {
        let temp = TempDir::new().unwrap();
        let logs = JsonResultSerializer
            .backtest_logs(&temp.path().join("1234.json"))
            .unwrap();
        assert!(logs.is_empty());
    }

    #[test]
    fn test_backtest_logs_reads_sibling_file() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("1234-log.txt"),
            "2024-03-01 09:31:00 Launching analysis\n2024-03-01T09:32:00Z Bought SPY\n",
        )
        .unwrap();

        let logs = JsonResultSerializer
            .backtest_logs(&temp.path().join("1234.json"))
            .unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].message, "Launching analysis");
        assert_eq!(logs[1].message, "Bought SPY");
        assert_eq!(
            logs[1].time,
            Utc.with_ymd_and_hms(2024, 3, 1, 9, 32, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_log_lines_continuation_keeps_previous_time() {
        let logs = parse_log_lines("2024-03-01 09:31:00 Runtime error\n  at Main()\n\n");
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[1].message, "  at Main()");
        assert_eq!(logs[1].time, logs[0].time);
    }

    #[test]
    fn test_parse_log_lines_without_any_timestamp() {
        let logs = parse_log_lines("hello");
        assert_eq!(logs[0].time, DateTime::<Utc>::default());
        assert_eq!(logs[0].message, "hello");
    }
}
