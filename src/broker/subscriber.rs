//! Subscriber handles
//!
//! A `Subscriber` is what the registry keeps for one live connection: the
//! sending half of that connection's outbound queue plus the session's
//! cancellation token. The socket itself stays with the session.

use std::fmt;

use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub type SubscriberId = Uuid;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("connection {0} is closed")]
    Closed(SubscriberId),
}

#[derive(Clone)]
pub struct Subscriber {
    id: SubscriberId,
    sender: UnboundedSender<String>,
    cancel: CancellationToken,
}

impl Subscriber {
    pub fn new(sender: UnboundedSender<String>, cancel: CancellationToken) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
            cancel,
        }
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Queue a serialized frame for the connection's writer.
    ///
    /// Fails once the session has dropped its end of the queue, or has been
    /// cancelled and will not write anything else.
    pub fn deliver(&self, frame: &str) -> Result<(), DeliveryError> {
        if self.cancel.is_cancelled() {
            return Err(DeliveryError::Closed(self.id));
        }
        self.sender
            .send(frame.to_owned())
            .map_err(|_| DeliveryError::Closed(self.id))
    }

    /// Signal the owning session to terminate. Safe to call any number of times.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }
}

impl PartialEq for Subscriber {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Subscriber {}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("id", &self.id)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}
