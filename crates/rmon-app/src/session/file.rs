//! File-backed session
//!
//! Reads a result file once, and while subscribed re-reads and republishes
//! it every time the watcher reports a change.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use rmon_core::prelude::*;
use rmon_core::{LogEntry, ResultContext, ResultSerializer};

use super::{next_session_id, Emitter, FileSessionParameters, Session, SessionId, SessionState};
use crate::dispatcher::Dispatcher;
use crate::event::SessionEvent;
use crate::watcher::{FileWatcher, WatcherConfig, WatcherEvent};

/// A result file on disk
pub struct FileSession {
    id: SessionId,
    /// Display name, the file name exactly as supplied
    name: String,
    /// Path read before a watch is installed
    source: PathBuf,
    /// Absolute path resolved on subscribe
    watch_path: Option<PathBuf>,
    watch_on_init: bool,
    state: SessionState,
    closed: bool,
    serializer: Arc<dyn ResultSerializer>,
    emitter: Emitter,
    watcher_config: WatcherConfig,
    watcher: Option<FileWatcher>,
}

impl std::fmt::Debug for FileSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSession")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("watch_path", &self.watch_path)
            .field("state", &self.state)
            .field("closed", &self.closed)
            .field("watching", &self.watcher.is_some())
            .finish()
    }
}

impl FileSession {
    /// Create a session for `params.file_name`.
    ///
    /// Fails with [`Error::InvalidParameters`] on an empty file name and
    /// with [`Error::NoCaptureContext`] when the dispatcher's owner pump is
    /// already gone. Touches no file.
    pub fn new(
        params: FileSessionParameters,
        serializer: Arc<dyn ResultSerializer>,
        dispatcher: Dispatcher,
        watcher_config: WatcherConfig,
    ) -> Result<Self> {
        if params.file_name.trim().is_empty() {
            return Err(Error::invalid_parameters("file name is empty"));
        }
        if dispatcher.is_closed() {
            return Err(Error::NoCaptureContext);
        }

        let id = next_session_id();
        debug!(session_id = id, file = %params.file_name, "created file session");

        Ok(Self {
            id,
            source: params.path(),
            name: params.file_name,
            watch_path: None,
            watch_on_init: params.watch,
            state: SessionState::Unsubscribed,
            closed: false,
            serializer,
            emitter: Emitter::new(id, dispatcher),
            watcher_config,
            watcher: None,
        })
    }

    /// Absolute path being watched, once subscribed
    pub fn watch_path(&self) -> Option<&Path> {
        self.watch_path.as_deref()
    }

    fn after_initial_read(&mut self, events: Vec<SessionEvent>) -> Result<()> {
        info!(
            session_id = self.id,
            "Loaded {} ({} events)",
            self.name,
            events.len()
        );
        self.emitter.post(events)?;
        if self.watch_on_init {
            // The data is already out; a failed watch leaves the session
            // loaded but unsubscribed.
            if let Err(e) = self.subscribe() {
                warn!(session_id = self.id, "Could not watch {}: {}", self.name, e);
                self.emitter.post(vec![SessionEvent::Log(LogEntry::monitor(format!(
                    "Could not watch {}: {}",
                    self.name, e
                )))])?;
            }
        }
        Ok(())
    }

    fn release_watcher(&mut self) {
        if let Some(mut watcher) = self.watcher.take() {
            watcher.stop();
        }
    }
}

impl Session for FileSession {
    fn id(&self) -> SessionId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> SessionState {
        self.state
    }

    fn can_subscribe(&self) -> bool {
        true
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn initialize(&mut self) -> Result<()> {
        if self.closed {
            debug!(session_id = self.id, "initialize on closed session ignored");
            return Ok(());
        }
        let events = load_batch(self.serializer.as_ref(), &self.source, &self.name)?;
        self.after_initial_read(events)
    }

    fn initialize_async(&mut self, cancel: CancellationToken) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            if self.closed {
                debug!(session_id = self.id, "initialize on closed session ignored");
                return Ok(());
            }

            let serializer = self.serializer.clone();
            let source = self.source.clone();
            let name = self.name.clone();
            let read = tokio::task::spawn_blocking(move || {
                load_batch(serializer.as_ref(), &source, &name)
            });

            let events = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(session_id = self.id, "Loading {} cancelled", self.name);
                    return Err(Error::Cancelled);
                }
                joined = read => joined.map_err(|e| Error::Io(std::io::Error::other(e)))??,
            };

            self.after_initial_read(events)
        })
    }

    fn subscribe(&mut self) -> Result<()> {
        if self.closed {
            debug!(session_id = self.id, "subscribe on closed session ignored");
            return Ok(());
        }
        if self.state == SessionState::Subscribed {
            return Ok(());
        }

        let watch_path = resolve_watch_path(&self.source)?;
        let generation = self.emitter.next_generation();
        let reloader = Reloader {
            name: self.name.clone(),
            path: watch_path.clone(),
            serializer: self.serializer.clone(),
            emitter: self.emitter.clone(),
            generation,
        };

        let mut watcher = FileWatcher::new(watch_path.clone(), self.watcher_config.clone());
        watcher.start(move |event| reloader.on_watch_event(event))?;

        // Nothing is committed until the owner has been told
        let subscribed = vec![SessionEvent::StateChanged(SessionState::Subscribed)];
        if let Err(e) = self.emitter.activate_watch(generation, subscribed) {
            watcher.stop();
            return Err(e);
        }

        self.watcher = Some(watcher);
        self.watch_path = Some(watch_path);
        self.state = SessionState::Subscribed;
        info!(session_id = self.id, "Subscribed to {}", self.name);
        Ok(())
    }

    fn unsubscribe(&mut self) -> Result<()> {
        if self.closed || self.state == SessionState::Unsubscribed {
            self.release_watcher();
            return Ok(());
        }

        self.state = SessionState::Unsubscribed;
        let posted = self
            .emitter
            .end_watch(vec![SessionEvent::StateChanged(self.state)]);
        self.release_watcher();
        info!(session_id = self.id, "Unsubscribed from {}", self.name);
        posted
    }

    fn shutdown(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }

        let unsubscribed = self.unsubscribe();
        self.release_watcher();
        self.emitter.close();
        self.closed = true;
        info!(session_id = self.id, "Session {} shut down", self.name);
        unsubscribed
    }
}

impl Drop for FileSession {
    fn drop(&mut self) {
        self.emitter.close();
        self.release_watcher();
    }
}

/// Watcher callback state; runs on the watcher's thread
struct Reloader {
    name: String,
    path: PathBuf,
    serializer: Arc<dyn ResultSerializer>,
    emitter: Emitter,
    generation: u64,
}

impl Reloader {
    fn on_watch_event(&self, event: WatcherEvent) {
        match event {
            WatcherEvent::Changed { count } => {
                debug!("{} changed ({} notification(s)), reloading", self.name, count);
                self.reload();
            }
            WatcherEvent::Error { message } => {
                warn!("Watcher error on {}: {}", self.name, message);
            }
        }
    }

    fn reload(&self) {
        let events = match load_batch(self.serializer.as_ref(), &self.path, &self.name) {
            Ok(events) => events,
            Err(e) => {
                warn!("Reload of {} failed: {}", self.name, e);
                vec![SessionEvent::ReloadFailed {
                    name: self.name.clone(),
                    message: e.to_string(),
                }]
            }
        };
        self.emitter.post_reload(self.generation, events);
    }
}

/// Resolve the path a watch is installed on.
///
/// Relative paths are resolved against the current working directory at
/// the time of the call.
fn resolve_watch_path(source: &Path) -> Result<PathBuf> {
    if source.is_absolute() {
        Ok(source.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(source))
    }
}

/// Full read of a result file, in delivery order: logs, order events, result
fn load_batch(
    serializer: &dyn ResultSerializer,
    path: &Path,
    name: &str,
) -> Result<Vec<SessionEvent>> {
    if !path.exists() {
        return Err(Error::source_not_found(path));
    }

    let result = serializer.deserialize(path)?;
    let logs = if result.logs.is_empty() {
        serializer.backtest_logs(path)?
    } else {
        result.logs.clone()
    };

    let mut events = Vec::with_capacity(logs.len() + result.order_events.len() + 1);
    events.extend(
        logs.into_iter()
            .map(|line| SessionEvent::Log(LogEntry::backtest(line))),
    );
    events.extend(
        result
            .order_events
            .iter()
            .cloned()
            .map(SessionEvent::OrderEvent),
    );
    events.push(SessionEvent::Result(ResultContext::completed(name, result)));
    Ok(events)
}
