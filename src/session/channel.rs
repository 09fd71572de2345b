//! Duplex channel handle with scheduler-aware delivery.
//!
//! A [`ChannelHandle`] is the sending half of a connection's outbound queue.
//! The connection's writer task, running on the runtime that accepted the
//! socket, drains the queue into the WebSocket. Senders may live anywhere:
//!
//! - On a runtime worker, inside async code: [`ChannelHandle::send`] awaits
//!   queue capacity directly.
//! - On a detached thread with no runtime: [`ChannelHandle::send_from_worker`]
//!   drives the send to completion on a short-lived local executor.
//! - On a runtime thread but in synchronous code: `send_from_worker` never
//!   blocks; it enqueues immediately or hands the message to a forwarding
//!   task on the owning runtime.
//!
//! Once a message has been handed off, later sends from any context queue
//! behind it until the forwarding task has delivered everything, so the
//! client sees messages in the order they were sent.
//!
//! In all cases a send returns once the message is accepted into the queue,
//! not when it reaches the client.

use crate::api::protocol::ServerMessage;
use crate::types::{AppError, Result};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

/// Outbound queue depth per connection.
pub const OUTBOUND_CAPACITY: usize = 256;

/// The execution context a send is issued from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryContext {
    /// The current thread is driven by a tokio runtime.
    Scheduler,
    /// No runtime is reachable from the current thread.
    Detached,
}

impl DeliveryContext {
    pub fn current() -> Self {
        match Handle::try_current() {
            Ok(_) => DeliveryContext::Scheduler,
            Err(_) => DeliveryContext::Detached,
        }
    }
}

/// Messages handed to the owning runtime because the queue was full.
///
/// While `pending` is non-zero every send goes through `queue`, so nothing
/// overtakes a message that is still waiting for room.
#[derive(Default)]
struct Handoff {
    pending: usize,
    queue: Option<mpsc::UnboundedSender<ServerMessage>>,
}

#[derive(Clone)]
pub struct ChannelHandle {
    connection_id: Uuid,
    tx: mpsc::Sender<ServerMessage>,
    owner: Handle,
    handoff: Arc<Mutex<Handoff>>,
}

impl std::fmt::Debug for ChannelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelHandle")
            .field("connection_id", &self.connection_id)
            .field("closed", &self.tx.is_closed())
            .field("pending", &self.handoff.lock().pending)
            .finish()
    }
}

impl ChannelHandle {
    /// Wrap an outbound sender whose receiver is drained on `owner`.
    pub fn new(tx: mpsc::Sender<ServerMessage>, owner: Handle) -> Self {
        Self {
            connection_id: Uuid::new_v4(),
            tx,
            owner,
            handoff: Arc::new(Mutex::new(Handoff::default())),
        }
    }

    /// Create a handle and its outbound queue on the current runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn open(capacity: usize) -> (Self, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx, Handle::current()), rx)
    }

    pub fn connection_id(&self) -> Uuid {
        self.connection_id
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Messages accepted but still waiting for queue capacity.
    pub fn pending(&self) -> usize {
        self.handoff.lock().pending
    }

    /// Send from async code running on a scheduler.
    pub async fn send(&self, message: ServerMessage) -> Result<()> {
        let message = {
            let mut handoff = self.handoff.lock();
            if handoff.pending > 0 {
                return self.hand_off(&mut handoff, message);
            }
            message
        };
        self.tx
            .send(message)
            .await
            .map_err(|_| self.closed_error())
    }

    /// Send from synchronous code, wherever it runs.
    pub fn send_from_worker(&self, message: ServerMessage) -> Result<()> {
        let mut handoff = self.handoff.lock();
        if handoff.pending > 0 {
            return self.hand_off(&mut handoff, message);
        }

        match DeliveryContext::current() {
            DeliveryContext::Detached => {
                drop(handoff);
                futures::executor::block_on(self.tx.send(message))
                    .map_err(|_| self.closed_error())
            }
            DeliveryContext::Scheduler => match self.tx.try_send(message) {
                Ok(()) => Ok(()),
                Err(TrySendError::Closed(_)) => Err(self.closed_error()),
                // Blocking here could stall the runtime that drains this queue.
                Err(TrySendError::Full(message)) => self.hand_off(&mut handoff, message),
            },
        }
    }

    /// Queue `message` behind any earlier handed-off messages.
    ///
    /// The forwarding task is started on the owning runtime on first use.
    fn hand_off(&self, handoff: &mut Handoff, message: ServerMessage) -> Result<()> {
        if self.tx.is_closed() {
            return Err(self.closed_error());
        }

        let queue = match &handoff.queue {
            Some(queue) if !queue.is_closed() => queue.clone(),
            _ => {
                let (queue, rx) = mpsc::unbounded_channel();
                self.owner.spawn(forward(
                    self.tx.clone(),
                    rx,
                    Arc::downgrade(&self.handoff),
                    self.connection_id,
                ));
                handoff.queue = Some(queue.clone());
                queue
            }
        };

        queue.send(message).map_err(|_| self.closed_error())?;
        handoff.pending += 1;
        Ok(())
    }

    fn closed_error(&self) -> AppError {
        AppError::ChannelUnavailable(format!("connection {} is closed", self.connection_id))
    }
}

/// Drain handed-off messages into the bounded queue, in order.
async fn forward(
    tx: mpsc::Sender<ServerMessage>,
    mut rx: mpsc::UnboundedReceiver<ServerMessage>,
    handoff: Weak<Mutex<Handoff>>,
    connection_id: Uuid,
) {
    while let Some(message) = rx.recv().await {
        let delivered = tx.send(message).await.is_ok();
        // Decrement only once the message is in the queue, so a direct send
        // that sees `pending == 0` can never overtake it.
        if let Some(handoff) = handoff.upgrade() {
            let mut handoff = handoff.lock();
            handoff.pending = handoff.pending.saturating_sub(1);
        }
        if !delivered {
            tracing::debug!(%connection_id, "channel closed before handoff delivery");
        }
    }
}
