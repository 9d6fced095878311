//! File watcher for result files
//!
//! Watches the directory containing a result file and reports debounced
//! changes to that one file. Watching the directory rather than the file
//! keeps the watch alive when the runtime replaces the file by rename.

use std::path::{Path, PathBuf};
use std::sync::mpsc as std_mpsc;
use std::thread::JoinHandle;
use std::time::Duration;

use notify::{EventKind, RecursiveMode};
use notify_debouncer_full::{new_debouncer, DebounceEventResult, DebouncedEvent};
use tracing::{debug, info, warn};

use rmon_core::prelude::{Error, Result};

/// Default debounce duration in milliseconds
pub const DEFAULT_DEBOUNCE_MS: u64 = 250;

/// Configuration for the file watcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatcherConfig {
    /// Debounce duration
    pub debounce: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
        }
    }
}

impl WatcherConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set debounce duration in milliseconds
    pub fn with_debounce_ms(mut self, ms: u64) -> Self {
        self.debounce = Duration::from_millis(ms);
        self
    }
}

/// What the watcher reports to its callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatcherEvent {
    /// The watched file changed; `count` debounced notifications were folded
    Changed { count: usize },
    /// The platform watcher reported an error
    Error { message: String },
}

/// Watches a single file for external modification
pub struct FileWatcher {
    /// Absolute path of the watched file
    target: PathBuf,
    /// Configuration
    config: WatcherConfig,
    /// Handle to stop the watcher
    stop_tx: Option<std_mpsc::Sender<()>>,
    /// Thread keeping the debouncer alive
    keeper: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatcher")
            .field("target", &self.target)
            .field("config", &self.config)
            .field("running", &self.is_running())
            .finish()
    }
}

impl FileWatcher {
    /// Create a watcher for `target`, which must be an absolute file path
    pub fn new(target: PathBuf, config: WatcherConfig) -> Self {
        Self {
            target,
            config,
            stop_tx: None,
            keeper: None,
        }
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Start watching.
    ///
    /// `on_event` runs on the debouncer's thread, never on the caller's.
    /// Fails if the watcher is already running or the containing
    /// directory cannot be watched.
    pub fn start<F>(&mut self, mut on_event: F) -> Result<()>
    where
        F: FnMut(WatcherEvent) + Send + 'static,
    {
        if self.is_running() {
            return Err(Error::watcher("Watcher is already running"));
        }

        let directory = self
            .target
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .ok_or_else(|| {
                Error::watcher(format!(
                    "{} has no containing directory",
                    self.target.display()
                ))
            })?
            .to_path_buf();
        let file_name = self
            .target
            .file_name()
            .ok_or_else(|| Error::watcher(format!("{} is not a file", self.target.display())))?
            .to_os_string();

        let mut debouncer = new_debouncer(
            self.config.debounce,
            None, // No tick rate override
            move |result: DebounceEventResult| match result {
                Ok(events) => {
                    let count = events
                        .iter()
                        .filter(|event| is_relevant(event, &file_name))
                        .count();
                    if count == 0 {
                        return;
                    }
                    debug!("File watcher detected {} change(s)", count);
                    on_event(WatcherEvent::Changed { count });
                }
                Err(errors) => {
                    for error in errors {
                        warn!("File watcher error: {:?}", error);
                        on_event(WatcherEvent::Error {
                            message: error.to_string(),
                        });
                    }
                }
            },
        )
        .map_err(|e| Error::watcher(format!("Failed to create watcher: {}", e)))?;

        debouncer
            .watch(&directory, RecursiveMode::NonRecursive)
            .map_err(|e| {
                Error::watcher(format!("Failed to watch {}: {}", directory.display(), e))
            })?;
        info!("Watching: {}", self.target.display());

        let (stop_tx, stop_rx) = std_mpsc::channel::<()>();
        let target = self.target.clone();
        let keeper = std::thread::Builder::new()
            .name("rmon-watcher".to_string())
            .spawn(move || {
                // Dropping the debouncer removes the watch
                let _debouncer = debouncer;
                let _ = stop_rx.recv();
                info!("File watcher stopping: {}", target.display());
            })?;

        self.stop_tx = Some(stop_tx);
        self.keeper = Some(keeper);
        Ok(())
    }

    /// Stop the file watcher and wait for the watch to be released
    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(keeper) = self.keeper.take() {
            if keeper.join().is_err() {
                warn!("File watcher thread panicked");
            }
        }
    }

    /// Check if watcher is running
    pub fn is_running(&self) -> bool {
        self.stop_tx.is_some()
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Does this debounced event touch the watched file?
fn is_relevant(event: &DebouncedEvent, file_name: &std::ffi::OsStr) -> bool {
    if matches!(event.kind, EventKind::Access(_)) {
        return false;
    }
    event
        .paths
        .iter()
        .any(|path| path.file_name() == Some(file_name))
}
