//! Owner context: marshals session events onto one consuming thread
//!
//! [`owner_context()`] is called on the thread that will consume events.
//! It returns a [`Dispatcher`], a cloneable `Send` handle sessions post
//! batches through from any thread, and an [`EventPump`] that stays on
//! the calling thread and invokes the [`SessionHandler`].
//!
//! The pump is `!Send`, so handler calls cannot migrate off the owner
//! thread. The channel is FIFO and every post is one [`Envelope`], so a
//! batch is delivered whole and batches keep their posting order.

use std::marker::PhantomData;
use std::thread::{self, ThreadId};

use tokio::sync::mpsc;

use rmon_core::prelude::*;

use crate::event::SessionEvent;
use crate::handler::SessionHandler;
use crate::session::SessionId;

/// A batch of events from one session, delivered atomically
#[derive(Debug, Clone)]
pub struct Envelope {
    pub session_id: SessionId,
    pub events: Vec<SessionEvent>,
}

/// Capability to schedule events for delivery on the owner context
#[derive(Debug, Clone)]
pub struct Dispatcher {
    tx: mpsc::UnboundedSender<Envelope>,
}

impl Dispatcher {
    /// Post a batch. Empty batches are dropped.
    ///
    /// Fails with [`Error::ChannelClosed`] once the owner's pump is gone.
    pub fn post(&self, session_id: SessionId, events: Vec<SessionEvent>) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }
        trace!(session_id, count = events.len(), "posting batch");
        self.tx
            .send(Envelope { session_id, events })
            .map_err(|_| Error::ChannelClosed)
    }

    /// True once the owner's pump has been dropped
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Owner-side half of the context: drains envelopes into a handler
#[derive(Debug)]
pub struct EventPump {
    rx: mpsc::UnboundedReceiver<Envelope>,
    owner: ThreadId,
    _not_send: PhantomData<*const ()>,
}

/// Capture the current thread as the owner context
pub fn owner_context() -> (Dispatcher, EventPump) {
    let (tx, rx) = mpsc::unbounded_channel();
    let pump = EventPump {
        rx,
        owner: thread::current().id(),
        _not_send: PhantomData,
    };
    (Dispatcher { tx }, pump)
}

impl EventPump {
    /// Thread the pump was created on
    pub fn owner_thread(&self) -> ThreadId {
        self.owner
    }

    /// Wait for the next batch without delivering it.
    ///
    /// Returns `None` when every [`Dispatcher`] has been dropped.
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.rx.recv().await
    }

    /// Wait for the next batch and deliver it to `handler`.
    ///
    /// Returns the number of events delivered, or `None` when every
    /// dispatcher has been dropped.
    pub async fn dispatch_next<H: SessionHandler + ?Sized>(
        &mut self,
        handler: &mut H,
    ) -> Option<usize> {
        let envelope = self.rx.recv().await?;
        Some(self.deliver(envelope, handler))
    }

    /// Deliver every batch already queued, without waiting.
    ///
    /// Returns the number of events delivered.
    pub fn dispatch_pending<H: SessionHandler + ?Sized>(&mut self, handler: &mut H) -> usize {
        let mut delivered = 0;
        while let Ok(envelope) = self.rx.try_recv() {
            delivered += self.deliver(envelope, handler);
        }
        delivered
    }

    fn deliver<H: SessionHandler + ?Sized>(&self, envelope: Envelope, handler: &mut H) -> usize {
        debug_assert_eq!(thread::current().id(), self.owner);

        let count = envelope.events.len();
        debug!(
            session_id = envelope.session_id,
            count, "delivering batch to handler"
        );
        for event in envelope.events {
            event.deliver(handler);
        }
        count
    }
}
