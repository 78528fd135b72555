//! The room-scoped notification broker.
//!
//! - [`SubscriptionRegistry`]: room id -> live subscribers, behind one lock.
//! - [`Notifier`]: fans a [`Notification`] out to a room's subscribers and
//!   cancels the ones whose delivery fails.
//! - [`Session`]: one subscribed connection, registered for exactly as long
//!   as it is active.
//!
//! Nothing here does network I/O while holding the registry lock. Fan-out
//! works on a snapshot, and the socket write itself happens in the owning
//! session.

pub mod event;
pub mod notifier;
pub mod registry;
pub mod session;
pub mod subscriber;

pub use event::{Event, MessageAnswered, MessageCreated, MessageReactionIncreased, Notification};
pub use notifier::{Dispatcher, Notifier};
pub use registry::SubscriptionRegistry;
pub use session::{Session, TerminationCause};
pub use subscriber::{DeliveryError, Subscriber, SubscriberId};
