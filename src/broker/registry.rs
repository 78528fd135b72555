//! Subscription registry
//!
//! Process-wide map of room id to the subscribers currently attached to it.
//! Every read and write goes through a single `Mutex`; nothing in here
//! blocks on I/O, so the lock is only ever held briefly.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use super::subscriber::{Subscriber, SubscriberId};
use crate::storage::RoomId;

#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    rooms: Mutex<HashMap<RoomId, HashMap<SubscriberId, Subscriber>>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // Every critical section leaves the map consistent, so a panic elsewhere
    // while the lock was held does not invalidate it.
    fn lock(&self) -> MutexGuard<'_, HashMap<RoomId, HashMap<SubscriberId, Subscriber>>> {
        self.rooms.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a subscriber to a room, creating the room's set if needed.
    /// Registering the same handle again replaces it.
    pub fn register(&self, room_id: RoomId, subscriber: Subscriber) {
        let id = subscriber.id();
        let mut rooms = self.lock();
        let subscribers = rooms.entry(room_id).or_default();
        subscribers.insert(id, subscriber);
        debug!(%room_id, subscriber = %id, total = subscribers.len(), "subscriber registered");
    }

    /// Remove a subscriber from a room. Returns `false` if it was not there.
    ///
    /// Rooms left without subscribers are pruned.
    pub fn deregister(&self, room_id: RoomId, id: SubscriberId) -> bool {
        let mut rooms = self.lock();
        let Some(subscribers) = rooms.get_mut(&room_id) else {
            return false;
        };

        let removed = subscribers.remove(&id).is_some();
        if subscribers.is_empty() {
            rooms.remove(&room_id);
        }
        if removed {
            debug!(%room_id, subscriber = %id, "subscriber deregistered");
        }
        removed
    }

    /// Copy out the room's current subscribers.
    pub fn snapshot(&self, room_id: RoomId) -> Vec<Subscriber> {
        self.lock()
            .get(&room_id)
            .map(|subscribers| subscribers.values().cloned().collect())
            .unwrap_or_default()
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, room_id: RoomId, id: SubscriberId) -> bool {
        self.lock()
            .get(&room_id)
            .is_some_and(|subscribers| subscribers.contains_key(&id))
    }

    pub fn subscriber_count(&self, room_id: RoomId) -> usize {
        self.lock().get(&room_id).map_or(0, HashMap::len)
    }

    /// Number of rooms with at least one subscriber.
    #[cfg(test)]
    pub(crate) fn room_count(&self) -> usize {
        self.lock().len()
    }
}
