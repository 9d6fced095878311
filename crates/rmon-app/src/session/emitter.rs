//! Per-session gate in front of the dispatcher
//!
//! Every post from a session (the owner calling lifecycle methods, or a
//! watcher thread publishing a reload) takes the same lock. Batches from
//! one session are therefore never interleaved, and once the gate is
//! closed nothing from that session reaches the owner context again.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rmon_core::prelude::*;

use super::SessionId;
use crate::dispatcher::Dispatcher;
use crate::event::SessionEvent;

#[derive(Debug)]
struct Gate {
    /// `None` once the session has shut down
    dispatcher: Option<Dispatcher>,
    /// Bumped on every subscribe; reloads carry the value they started under
    watch_generation: u64,
    watching: bool,
}

/// Cloneable handle shared between a session and its watcher callback
#[derive(Debug, Clone)]
pub(crate) struct Emitter {
    session_id: SessionId,
    gate: Arc<Mutex<Gate>>,
}

impl Emitter {
    pub(crate) fn new(session_id: SessionId, dispatcher: Dispatcher) -> Self {
        Self {
            session_id,
            gate: Arc::new(Mutex::new(Gate {
                dispatcher: Some(dispatcher),
                watch_generation: 0,
                watching: false,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Gate> {
        self.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Post a batch from the session itself. A closed gate swallows it.
    pub(crate) fn post(&self, events: Vec<SessionEvent>) -> Result<()> {
        let gate = self.lock();
        match &gate.dispatcher {
            Some(dispatcher) => dispatcher.post(self.session_id, events),
            None => Ok(()),
        }
    }

    /// Reserve a new watch generation.
    ///
    /// Invalidates every earlier generation. Reloads are still refused
    /// until [`activate_watch`](Self::activate_watch) runs.
    pub(crate) fn next_generation(&self) -> u64 {
        let mut gate = self.lock();
        gate.watch_generation += 1;
        gate.watching = false;
        gate.watch_generation
    }

    /// Post `events`, then start accepting reloads from `generation`.
    ///
    /// Both happen under the gate lock, so no reload can land before
    /// `events`.
    pub(crate) fn activate_watch(&self, generation: u64, events: Vec<SessionEvent>) -> Result<()> {
        let mut gate = self.lock();
        let Some(dispatcher) = &gate.dispatcher else {
            return Ok(());
        };
        dispatcher.post(self.session_id, events)?;
        if gate.watch_generation == generation {
            gate.watching = true;
        }
        Ok(())
    }

    /// Stop accepting reloads, then post `events`.
    ///
    /// No reload can land after `events`.
    pub(crate) fn end_watch(&self, events: Vec<SessionEvent>) -> Result<()> {
        let mut gate = self.lock();
        gate.watching = false;
        match &gate.dispatcher {
            Some(dispatcher) => dispatcher.post(self.session_id, events),
            None => Ok(()),
        }
    }

    /// Post a reload batch if `generation` is still the live watch.
    ///
    /// Returns whether the batch was accepted.
    pub(crate) fn post_reload(&self, generation: u64, events: Vec<SessionEvent>) -> bool {
        let gate = self.lock();
        if !gate.watching || gate.watch_generation != generation {
            debug!(
                session_id = self.session_id,
                generation, "dropping reload from stale watch"
            );
            return false;
        }
        match &gate.dispatcher {
            Some(dispatcher) => match dispatcher.post(self.session_id, events) {
                Ok(()) => true,
                Err(e) => {
                    warn!(session_id = self.session_id, "reload not delivered: {}", e);
                    false
                }
            },
            None => false,
        }
    }

    /// Close the gate for good
    pub(crate) fn close(&self) {
        let mut gate = self.lock();
        gate.watching = false;
        gate.dispatcher = None;
    }
}
