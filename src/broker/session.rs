//! Live connection sessions
//!
//! A `Session` exists only once the room has been validated and the
//! WebSocket upgrade has succeeded. Creating it registers the connection;
//! the registration is removed exactly once, when the session is dropped or
//! finishes [`Session::run`], whichever comes first.
//!
//! ```text
//! activate() ──► Active ──(client gone | write failed | cancelled)──► deregistered ──► socket dropped
//! ```

use std::fmt;
use std::sync::Arc;

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::registry::SubscriptionRegistry;
use super::subscriber::{Subscriber, SubscriberId};
use crate::storage::RoomId;

/// Why a session stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationCause {
    /// The client closed the connection or the read side failed.
    ClientDisconnected,
    /// A write to the client failed, or the notifier cancelled the session
    /// after a failed delivery.
    DeliveryFailed,
    /// The server is shutting down.
    Shutdown,
}

impl fmt::Display for TerminationCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cause = match self {
            TerminationCause::ClientDisconnected => "client disconnected",
            TerminationCause::DeliveryFailed => "delivery failed",
            TerminationCause::Shutdown => "server shutdown",
        };
        f.write_str(cause)
    }
}

pub struct Session {
    room_id: RoomId,
    subscriber: Subscriber,
    registry: Arc<SubscriptionRegistry>,
    shutdown: CancellationToken,
    outbound: mpsc::UnboundedReceiver<String>,
    registered: bool,
}

impl Session {
    /// Register a new connection for `room_id`.
    ///
    /// The session's token is a child of `shutdown`, so cancelling the server
    /// token ends every session.
    pub fn activate(
        registry: Arc<SubscriptionRegistry>,
        room_id: RoomId,
        shutdown: &CancellationToken,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscriber = Subscriber::new(tx, shutdown.child_token());
        registry.register(room_id, subscriber.clone());
        info!(%room_id, subscriber = %subscriber.id(), "new client connected");

        Self {
            room_id,
            subscriber,
            registry,
            shutdown: shutdown.clone(),
            outbound: rx,
            registered: true,
        }
    }

    pub fn id(&self) -> SubscriberId {
        self.subscriber.id()
    }

    #[cfg(test)]
    pub(crate) fn room_id(&self) -> RoomId {
        self.room_id
    }

    #[cfg(test)]
    pub(crate) fn is_active(&self) -> bool {
        self.registered && !self.subscriber.is_cancelled()
    }

    /// The token the notifier fires to end this session.
    pub fn token(&self) -> CancellationToken {
        self.subscriber.token().clone()
    }

    /// Resolves once the session has been cancelled.
    #[cfg(test)]
    pub(crate) async fn cancelled(&self) {
        self.subscriber.token().cancelled().await
    }

    /// Pump queued frames into `sink` until the session ends.
    ///
    /// `inbound` is the client's side of the connection: items are ignored,
    /// and the end of the stream means the client is gone. When this returns
    /// the session is deregistered and both halves of the connection have
    /// been dropped.
    pub async fn run<W, R>(mut self, mut sink: W, mut inbound: R) -> TerminationCause
    where
        W: Sink<String> + Unpin,
        W::Error: fmt::Display,
        R: Stream + Unpin,
    {
        let token = self.token();

        let cause = 'session: loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break self.cancel_cause(),
                frame = self.outbound.recv() => {
                    let Some(frame) = frame else {
                        break TerminationCause::DeliveryFailed;
                    };
                    // a client that stops reading must not hold off cancellation
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => break 'session self.cancel_cause(),
                        sent = sink.send(frame) => {
                            if let Err(e) = sent {
                                warn!(room_id = %self.room_id, subscriber = %self.id(), "write to client failed: {e}");
                                break 'session TerminationCause::DeliveryFailed;
                            }
                        }
                    }
                }
                incoming = inbound.next() => {
                    if incoming.is_none() {
                        break TerminationCause::ClientDisconnected;
                    }
                    debug!(subscriber = %self.id(), "ignoring client frame");
                }
            }
        };

        token.cancel();
        self.release();
        info!(room_id = %self.room_id, subscriber = %self.id(), %cause, "session ended");

        drop(inbound);
        drop(sink);
        cause
    }

    fn cancel_cause(&self) -> TerminationCause {
        if self.shutdown.is_cancelled() {
            TerminationCause::Shutdown
        } else {
            TerminationCause::DeliveryFailed
        }
    }

    fn release(&mut self) {
        if std::mem::take(&mut self.registered) {
            self.subscriber.cancel();
            self.registry.deregister(self.room_id, self.subscriber.id());
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("room_id", &self.room_id)
            .field("subscriber", &self.subscriber)
            .field("registered", &self.registered)
            .finish()
    }
}
