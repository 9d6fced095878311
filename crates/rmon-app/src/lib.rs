//! rmon-app - Sessions and orchestration for Result Monitor
//!
//! A session reads one result source and publishes typed events. Events
//! travel through the [`Dispatcher`] and are delivered by the
//! [`EventPump`] on the single owner context, where a [`SessionHandler`]
//! consumes them. [`SessionService`] keeps at most one session active.

pub mod config;
pub mod dispatcher;
pub mod event;
pub mod handler;
pub mod service;
pub mod session;
pub mod signals;
pub mod watcher;

// Re-export primary types
pub use config::Settings;
pub use dispatcher::{owner_context, Dispatcher, Envelope, EventPump};
pub use event::SessionEvent;
pub use handler::SessionHandler;
pub use service::{ServicePhase, SessionService};
pub use session::{
    FileSession, FileSessionParameters, Session, SessionId, SessionParameters, SessionState,
};
pub use watcher::{FileWatcher, WatcherConfig, WatcherEvent};

#[cfg(any(test, feature = "test-helpers"))]
pub use handler::RecordingHandler;
