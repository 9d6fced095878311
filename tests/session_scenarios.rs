//! End-to-end session scenarios against result file fixtures
//!
//! Each test copies a fixture into a temp dir, opens it through the
//! public API and inspects what the owner context receives.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;

use rmon_app::config::Settings;
use rmon_app::{
    owner_context, EventPump, FileSession, FileSessionParameters, RecordingHandler, Session,
    SessionEvent, SessionParameters, SessionService, SessionState, WatcherConfig,
};
use rmon_core::{Error, JsonResultSerializer, LogKind};

const BACKTEST: &str = include_str!("fixtures/results/backtest.json");
const LIVE: &str = include_str!("fixtures/results/live.json");
const OFFLINE: &str = include_str!("fixtures/results/offline.json");
const OFFLINE_LOG: &str = include_str!("fixtures/results/offline-log.txt");

fn fixture(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn file_session(path: &Path, watch: bool) -> (FileSession, EventPump) {
    let (dispatcher, pump) = owner_context();
    let session = FileSession::new(
        FileSessionParameters::new(path.to_string_lossy(), watch),
        Arc::new(JsonResultSerializer::new()),
        dispatcher,
        WatcherConfig::new().with_debounce_ms(50),
    )
    .unwrap();
    (session, pump)
}

/// Pump until `done` says so or the deadline passes
async fn pump_until(
    pump: &mut EventPump,
    handler: &mut RecordingHandler,
    mut done: impl FnMut(&RecordingHandler) -> bool,
) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while !done(handler) {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        match tokio::time::timeout(remaining, pump.dispatch_next(handler)).await {
            Ok(Some(_)) => {}
            Ok(None) | Err(_) => break,
        }
    }
}

#[test]
fn test_backtest_file_without_watch() {
    let temp = TempDir::new().unwrap();
    let path = fixture(temp.path(), "backtest.json", BACKTEST);
    let (mut session, mut pump) = file_session(&path, false);

    assert_ok!(session.initialize());

    let mut handler = RecordingHandler::default();
    pump.dispatch_pending(&mut handler);
    assert_eq!(
        handler.labels(),
        vec!["log", "log", "log", "order_event", "order_event", "result"]
    );
    assert_eq!(
        handler.log_messages(),
        vec![
            "Launching analysis for SPY",
            "Purchased 100 SPY at 510.20",
            "Algorithm completed",
        ]
    );

    let result = handler.results()[0];
    assert_eq!(result.progress, 1.0);
    assert_eq!(result.name, path.to_string_lossy());
    assert_eq!(result.result.statistics["Sharpe Ratio"], "1.31");
    assert!(result.result.extra.contains_key("charts"));

    assert_eq!(session.state(), SessionState::Unsubscribed);
    assert_ok!(session.shutdown());
    assert_eq!(pump.dispatch_pending(&mut handler), 0);
}

#[test]
fn test_offline_result_reads_sibling_log_file() {
    let temp = TempDir::new().unwrap();
    let path = fixture(temp.path(), "offline.json", OFFLINE);
    fixture(temp.path(), "offline-log.txt", OFFLINE_LOG);
    let (mut session, mut pump) = file_session(&path, false);

    assert_ok!(session.initialize());

    let mut handler = RecordingHandler::default();
    pump.dispatch_pending(&mut handler);
    let logs: Vec<_> = handler
        .events
        .iter()
        .filter_map(|event| match event {
            SessionEvent::Log(entry) => Some(entry),
            _ => None,
        })
        .collect();

    assert_eq!(logs.len(), 4);
    assert!(logs.iter().all(|entry| entry.kind == LogKind::Backtest));
    assert_eq!(logs[2].timestamp, logs[1].timestamp);
    assert_eq!(handler.labels().last(), Some(&"result"));
}

#[test]
fn test_missing_file_emits_nothing() {
    let temp = TempDir::new().unwrap();
    let (mut session, mut pump) = file_session(&temp.path().join("gone.json"), false);

    let err = assert_err!(session.initialize());
    assert!(matches!(err, Error::SourceNotFound { .. }));

    let mut handler = RecordingHandler::default();
    assert_eq!(pump.dispatch_pending(&mut handler), 0);
}

#[tokio::test]
async fn test_live_file_republishes_on_rewrite() {
    let temp = TempDir::new().unwrap();
    let path = fixture(temp.path(), "live.json", LIVE);
    let (mut session, mut pump) = file_session(&path, true);

    assert_ok!(session.initialize_async(CancellationToken::new()).await);
    assert_eq!(session.state(), SessionState::Subscribed);

    let mut handler = RecordingHandler::default();
    pump.dispatch_pending(&mut handler);
    assert_eq!(handler.labels(), vec!["log", "result", "state_changed"]);
    handler.clear();

    let rewritten = LIVE.replace("\"Total Trades\": \"0\"", "\"Total Trades\": \"3\"");
    std::fs::write(&path, rewritten).unwrap();

    pump_until(&mut pump, &mut handler, |h| {
        h.results()
            .iter()
            .any(|r| r.result.statistics.get("Total Trades").map(String::as_str) == Some("3"))
    })
    .await;

    // A full batch from scratch, with no state change in between
    let labels = handler.labels();
    assert!(!labels.contains(&"state_changed"));
    assert_eq!(labels[labels.len() - 2..], ["log", "result"]);
    assert_eq!(
        handler.log_messages().last().copied(),
        Some("Live trading started")
    );

    assert_ok!(session.shutdown());
    handler.clear();
    pump.dispatch_pending(&mut handler);
    assert_eq!(handler.states(), vec![SessionState::Unsubscribed]);
}

#[tokio::test]
async fn test_service_replaces_sessions_in_order() {
    let temp = TempDir::new().unwrap();
    let live = fixture(temp.path(), "live.json", LIVE);
    let backtest = fixture(temp.path(), "backtest.json", BACKTEST);

    let (dispatcher, mut pump) = owner_context();
    let mut service = SessionService::new(
        dispatcher,
        Arc::new(JsonResultSerializer::new()),
        Settings::default(),
    );

    assert_ok!(
        service
            .open(
                SessionParameters::file(live.to_string_lossy(), true),
                CancellationToken::new(),
            )
            .await
    );
    assert!(service.is_session_subscribed());

    assert_ok!(
        service
            .open(
                SessionParameters::file(backtest.to_string_lossy(), false),
                CancellationToken::new(),
            )
            .await
    );
    assert!(!service.is_session_subscribed());
    let backtest_name = backtest.to_string_lossy().into_owned();
    assert_eq!(service.current_name(), Some(backtest_name.as_str()));

    let mut handler = RecordingHandler::default();
    pump.dispatch_pending(&mut handler);
    assert_eq!(
        handler.labels(),
        vec![
            // live.json
            "log",
            "result",
            "state_changed",
            "state_changed",
            // backtest.json
            "log",
            "log",
            "log",
            "order_event",
            "order_event",
            "result",
        ]
    );
    assert_eq!(
        handler.states(),
        vec![SessionState::Subscribed, SessionState::Unsubscribed]
    );
}
