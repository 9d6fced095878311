//! Sessions: one data source with its own lifecycle
//!
//! - `Session` - lifecycle contract every source implements
//! - `FileSession` - result file on disk, optionally watched for changes
//! - `SessionParameters` - what to open
//! - `Emitter` (crate-private) - per-session gate in front of the dispatcher

mod emitter;
mod file;
mod parameters;

pub use file::FileSession;
pub use parameters::{FileSessionParameters, SessionParameters};

pub(crate) use emitter::Emitter;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use rmon_core::prelude::*;

/// Unique identifier for a session
pub type SessionId = u64;

/// Counter for generating unique session IDs
static SESSION_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generate a new unique session ID
pub(crate) fn next_session_id() -> SessionId {
    SESSION_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Subscription state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Read once; not watching the source
    #[default]
    Unsubscribed,
    /// Watching the source and republishing on change
    Subscribed,
}

impl SessionState {
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Unsubscribed => "unsubscribed",
            SessionState::Subscribed => "subscribed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Lifecycle contract for a data source.
///
/// ```text
/// Unsubscribed --subscribe()--> Subscribed --unsubscribe()--> Unsubscribed
///       \                            /
///        `------- shutdown() -------'   (terminal)
/// ```
///
/// Every state change goes through the session's own setter, which emits
/// a `StateChanged` event. After `shutdown()` all lifecycle calls are
/// no-ops returning `Ok`, so teardown during error unwinding is safe.
/// Dropping a session releases its watch resources without emitting.
pub trait Session: Send + fmt::Debug {
    fn id(&self) -> SessionId;

    /// Display name, exactly as supplied by the caller
    fn name(&self) -> &str;

    fn state(&self) -> SessionState;

    /// Whether this source type can be watched
    fn can_subscribe(&self) -> bool;

    /// True once `shutdown()` has run
    fn is_closed(&self) -> bool;

    /// Blocking first full read.
    ///
    /// Publishes logs, then order events, then one result, as one batch.
    /// Publishes nothing on failure.
    fn initialize(&mut self) -> Result<()>;

    /// Non-blocking first full read.
    ///
    /// If `cancel` fires before the read completes, returns
    /// [`Error::Cancelled`] without publishing anything.
    fn initialize_async(&mut self, cancel: CancellationToken) -> BoxFuture<'_, Result<()>>;

    /// Start watching the source. Emits `StateChanged(Subscribed)`.
    fn subscribe(&mut self) -> Result<()>;

    /// Stop watching. Emits `StateChanged(Unsubscribed)` unless already
    /// unsubscribed.
    fn unsubscribe(&mut self) -> Result<()>;

    /// Unsubscribe and release every resource. Terminal.
    fn shutdown(&mut self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_ids_are_unique() {
        let a = next_session_id();
        let b = next_session_id();
        assert_ne!(a, b);
    }

    #[test]
    fn test_default_state_is_unsubscribed() {
        assert_eq!(SessionState::default(), SessionState::Unsubscribed);
        assert_eq!(SessionState::Subscribed.to_string(), "subscribed");
    }
}
