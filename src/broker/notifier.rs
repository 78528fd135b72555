//! Notification fan-out
//!
//! Request handlers call [`Notifier::dispatch`], which only enqueues. A
//! single [`Dispatcher`] task drains that queue and runs [`Notifier::publish`]
//! for each notification in turn, so notifications for a room reach every
//! subscriber in the order they were dispatched while the HTTP response goes
//! out without waiting on any client.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::event::Notification;
use super::registry::SubscriptionRegistry;

#[derive(Debug, Clone)]
pub struct Notifier {
    registry: Arc<SubscriptionRegistry>,
    queue: mpsc::UnboundedSender<Notification>,
}

/// Background half of a [`Notifier`]; see [`Dispatcher::run`].
#[derive(Debug)]
pub struct Dispatcher {
    notifier: Notifier,
    queue: mpsc::UnboundedReceiver<Notification>,
}

impl Notifier {
    /// Create a notifier and the dispatcher that must be spawned to drain it.
    pub fn new(registry: Arc<SubscriptionRegistry>) -> (Self, Dispatcher) {
        let (tx, rx) = mpsc::unbounded_channel();
        let notifier = Self {
            registry,
            queue: tx,
        };
        let dispatcher = Dispatcher {
            notifier: notifier.clone(),
            queue: rx,
        };
        (notifier, dispatcher)
    }

    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    /// Schedule a notification for fan-out. Never blocks and never fails the
    /// caller; if the dispatcher is gone the notification is dropped.
    pub fn dispatch(&self, notification: Notification) {
        if let Err(mpsc::error::SendError(dropped)) = self.queue.send(notification) {
            debug!(
                room_id = %dropped.room_id,
                kind = dropped.event.kind(),
                "dispatcher stopped, dropping notification"
            );
        }
    }

    /// Deliver a notification to every subscriber registered for its room at
    /// this moment. Returns the number of delivery attempts made.
    ///
    /// A subscriber whose delivery fails is cancelled; its session takes care
    /// of deregistering it.
    pub fn publish(&self, notification: &Notification) -> usize {
        let subscribers = self.registry.snapshot(notification.room_id);
        if subscribers.is_empty() {
            return 0;
        }

        let frame = match notification.to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                error!(room_id = %notification.room_id, "failed to serialize notification: {e}");
                return 0;
            }
        };

        for subscriber in &subscribers {
            if let Err(e) = subscriber.deliver(&frame) {
                warn!(
                    room_id = %notification.room_id,
                    subscriber = %subscriber.id(),
                    "failed to send message to client: {e}"
                );
                subscriber.cancel();
            }
        }

        debug!(
            room_id = %notification.room_id,
            kind = notification.event.kind(),
            attempts = subscribers.len(),
            "notification published"
        );
        subscribers.len()
    }
}

impl Dispatcher {
    /// Drain the queue until `shutdown` fires. Anything still queued at that
    /// point is dropped.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!("notification dispatcher started");
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                next = self.queue.recv() => match next {
                    Some(notification) => {
                        self.notifier.publish(&notification);
                    }
                    None => break,
                },
            }
        }
        info!("notification dispatcher stopped");
    }
}
