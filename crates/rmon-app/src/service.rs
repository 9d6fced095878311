//! Owns the single active session
//!
//! `SessionService` is what the outer application talks to: open a
//! source, toggle its subscription, close it. Replacing a session is a
//! small state machine:
//!
//! ```text
//! Idle --open--> Opening --ok--> Active --open/shutdown--> Closing --> Idle
//!                   \--err--> Idle
//! ```
//!
//! The previous session is fully shut down (watch released, gate closed)
//! before the next one is built, so their events never interleave on the
//! owner context.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use rmon_core::prelude::*;
use rmon_core::ResultSerializer;

use crate::config::Settings;
use crate::dispatcher::Dispatcher;
use crate::session::{FileSession, Session, SessionParameters, SessionState};

/// Where the service is in replacing its session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServicePhase {
    /// No session
    #[default]
    Idle,
    /// A new session is being built and initialized
    Opening,
    /// A session is current
    Active,
    /// The current session is being shut down
    Closing,
}

/// Holds the service in `Opening` for the length of an initialize.
///
/// If the open future is dropped before [`settle`](Self::settle) runs, the
/// phase falls back to `Idle`; the half-built session is dropped with it.
struct OpeningGuard<'a> {
    phase: &'a mut ServicePhase,
}

impl<'a> OpeningGuard<'a> {
    fn new(phase: &'a mut ServicePhase) -> Self {
        *phase = ServicePhase::Opening;
        Self { phase }
    }

    fn settle(self, phase: ServicePhase) {
        *self.phase = phase;
    }
}

impl Drop for OpeningGuard<'_> {
    fn drop(&mut self) {
        if *self.phase == ServicePhase::Opening {
            debug!("Open abandoned, back to idle");
            *self.phase = ServicePhase::Idle;
        }
    }
}

/// Orchestrates at most one active session
pub struct SessionService {
    dispatcher: Dispatcher,
    serializer: Arc<dyn ResultSerializer>,
    settings: Settings,
    current: Option<Box<dyn Session>>,
    phase: ServicePhase,
}

impl std::fmt::Debug for SessionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionService")
            .field("phase", &self.phase)
            .field("current", &self.current)
            .field("settings", &self.settings)
            .finish()
    }
}

impl SessionService {
    /// Create a service delivering through `dispatcher`
    pub fn new(
        dispatcher: Dispatcher,
        serializer: Arc<dyn ResultSerializer>,
        settings: Settings,
    ) -> Self {
        Self {
            dispatcher,
            serializer,
            settings,
            current: None,
            phase: ServicePhase::Idle,
        }
    }

    pub fn phase(&self) -> ServicePhase {
        self.phase
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The current session, if any
    pub fn current(&self) -> Option<&dyn Session> {
        self.current.as_deref()
    }

    /// Display name of the current session
    pub fn current_name(&self) -> Option<&str> {
        self.current.as_ref().map(|s| s.name())
    }

    /// Open the source described by `parameters`, replacing the current
    /// session.
    ///
    /// On failure the service is left idle and the error is returned.
    /// The previous session is not restored.
    pub async fn open(
        &mut self,
        parameters: SessionParameters,
        cancel: CancellationToken,
    ) -> Result<()> {
        self.shutdown_session();

        self.phase = ServicePhase::Opening;
        let session = match self.create_session(parameters) {
            Ok(session) => session,
            Err(e) => {
                self.phase = ServicePhase::Idle;
                return Err(e);
            }
        };
        self.activate(session, cancel).await
    }

    /// Open an already constructed session, replacing the current one.
    ///
    /// Same contract as [`open`](Self::open); use this for source types
    /// the service does not build itself.
    pub async fn open_session(
        &mut self,
        session: Box<dyn Session>,
        cancel: CancellationToken,
    ) -> Result<()> {
        self.shutdown_session();
        self.phase = ServicePhase::Opening;
        self.activate(session, cancel).await
    }

    async fn activate(
        &mut self,
        mut session: Box<dyn Session>,
        cancel: CancellationToken,
    ) -> Result<()> {
        info!("Opening session {}", session.name());
        let phase = OpeningGuard::new(&mut self.phase);

        if let Err(e) = session.initialize_async(cancel).await {
            warn!("Failed to open {}: {}", session.name(), e);
            if let Err(shutdown_err) = session.shutdown() {
                debug!("Shutdown after failed open: {}", shutdown_err);
            }
            phase.settle(ServicePhase::Idle);
            return Err(e);
        }

        if self.settings.session.auto_subscribe
            && session.can_subscribe()
            && session.state() == SessionState::Unsubscribed
        {
            if let Err(e) = session.subscribe() {
                warn!("Auto-subscribe of {} failed: {}", session.name(), e);
            }
        }

        info!("Session {} active", session.name());
        self.current = Some(session);
        phase.settle(ServicePhase::Active);
        Ok(())
    }

    fn create_session(&self, parameters: SessionParameters) -> Result<Box<dyn Session>> {
        match parameters {
            SessionParameters::File(params) => Ok(Box::new(FileSession::new(
                params,
                self.serializer.clone(),
                self.dispatcher.clone(),
                self.settings.watcher_config(),
            )?)),
        }
    }

    /// Shut down and forget the current session. Idempotent.
    pub fn shutdown_session(&mut self) {
        let Some(mut session) = self.current.take() else {
            return;
        };

        self.phase = ServicePhase::Closing;
        if let Err(e) = session.shutdown() {
            warn!("Error shutting down {}: {}", session.name(), e);
        }
        info!("Session {} closed", session.name());
        self.phase = ServicePhase::Idle;
    }

    /// A session is current and has not been shut down
    pub fn is_session_active(&self) -> bool {
        self.current.as_ref().is_some_and(|s| !s.is_closed())
    }

    /// The current session is subscribed
    pub fn is_session_subscribed(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|s| s.state() == SessionState::Subscribed)
    }

    /// Subscribe (`true`) or unsubscribe (`false`) the current session
    pub fn set_session_subscribed(&mut self, subscribed: bool) -> Result<()> {
        let session = self.current.as_mut().ok_or(Error::NoActiveSession)?;
        if !subscribed {
            return session.unsubscribe();
        }
        if !session.can_subscribe() {
            return Err(Error::subscribe_unsupported(session.name()));
        }
        session.subscribe()
    }

    /// Whether the current session can be subscribed; `false` when idle
    pub fn can_subscribe(&self) -> bool {
        self.current.as_ref().is_some_and(|s| s.can_subscribe())
    }
}

impl Drop for SessionService {
    fn drop(&mut self) {
        self.shutdown_session();
    }
}
