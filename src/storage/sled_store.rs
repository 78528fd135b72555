//! Rooms and messages backed by `sled`.
//!
//! Layout:
//! - `rooms`: room id -> JSON `Room`
//! - `messages`: message id -> JSON `MessageRecord`
//! - `room_messages`: room id ++ big-endian sequence -> message id
//!
//! The sequence comes from `Db::generate_id`, which is monotonic, so a prefix
//! scan over `room_messages` yields a room's messages in creation order.

use serde::de::DeserializeOwned;
use sled::{Db, IVec, Tree};
use tracing::debug;
use uuid::Uuid;

use super::error::StoreError;
use super::model::{MessageId, MessageRecord, Room, RoomId};
use super::Store;

#[derive(Clone)]
pub struct SledStore {
    db: Db,
    rooms: Tree,
    messages: Tree,
    room_messages: Tree,
}

impl SledStore {
    /// Open or create a sled database at `path`.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// A throwaway database that is removed when dropped.
    pub fn temporary() -> Result<Self, StoreError> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> Result<Self, StoreError> {
        Ok(Self {
            rooms: db.open_tree("rooms")?,
            messages: db.open_tree("messages")?,
            room_messages: db.open_tree("room_messages")?,
            db,
        })
    }

    /// Flush dirty pages to disk, returning the number of bytes written.
    pub fn flush(&self) -> Result<usize, StoreError> {
        Ok(self.db.flush()?)
    }

    fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Read-modify-write a message with compare-and-swap, retrying on conflict.
    fn update_message<F>(&self, id: MessageId, mut apply: F) -> Result<MessageRecord, StoreError>
    where
        F: FnMut(&mut MessageRecord),
    {
        loop {
            let current: IVec = self
                .messages
                .get(id.as_bytes())?
                .ok_or(StoreError::NotFound)?;
            let mut record: MessageRecord = Self::decode(&current)?;
            apply(&mut record);
            let next = serde_json::to_vec(&record)?;

            match self
                .messages
                .compare_and_swap(id.as_bytes(), Some(current), Some(next))?
            {
                Ok(()) => return Ok(record),
                Err(_) => debug!(message_id = %id, "concurrent update, retrying"),
            }
        }
    }
}

impl Store for SledStore {
    fn create_room(&self, theme: &str) -> Result<RoomId, StoreError> {
        let room = Room {
            id: Uuid::new_v4(),
            theme: theme.to_string(),
        };
        self.rooms
            .insert(room.id.as_bytes(), serde_json::to_vec(&room)?)?;
        Ok(room.id)
    }

    fn list_rooms(&self) -> Result<Vec<Room>, StoreError> {
        self.rooms
            .iter()
            .values()
            .map(|value| Self::decode::<Room>(&value?))
            .collect()
    }

    fn get_room(&self, id: RoomId) -> Result<Room, StoreError> {
        let bytes = self.rooms.get(id.as_bytes())?.ok_or(StoreError::NotFound)?;
        Self::decode(&bytes)
    }

    fn create_message(&self, room_id: RoomId, text: &str) -> Result<MessageId, StoreError> {
        self.get_room(room_id)?;

        let record = MessageRecord {
            id: Uuid::new_v4(),
            room_id,
            message: text.to_string(),
            reaction_count: 0,
            answered: false,
        };
        self.messages
            .insert(record.id.as_bytes(), serde_json::to_vec(&record)?)?;

        let seq = self.db.generate_id()?;
        let mut key = Vec::with_capacity(24);
        key.extend_from_slice(room_id.as_bytes());
        key.extend_from_slice(&seq.to_be_bytes());
        self.room_messages.insert(key, &record.id.as_bytes()[..])?;

        Ok(record.id)
    }

    fn list_messages(&self, room_id: RoomId) -> Result<Vec<MessageRecord>, StoreError> {
        self.get_room(room_id)?;

        let mut records = Vec::new();
        for entry in self.room_messages.scan_prefix(room_id.as_bytes()) {
            let (_, message_id) = entry?;
            // index rows are written after the message itself
            if let Some(bytes) = self.messages.get(&message_id)? {
                records.push(Self::decode(&bytes)?);
            }
        }
        Ok(records)
    }

    fn get_message(&self, id: MessageId) -> Result<MessageRecord, StoreError> {
        let bytes = self
            .messages
            .get(id.as_bytes())?
            .ok_or(StoreError::NotFound)?;
        Self::decode(&bytes)
    }

    fn react_to_message(&self, id: MessageId) -> Result<i64, StoreError> {
        let record = self.update_message(id, |record| record.reaction_count += 1)?;
        Ok(record.reaction_count)
    }

    fn mark_message_answered(&self, id: MessageId) -> Result<(), StoreError> {
        self.update_message(id, |record| record.answered = true)?;
        Ok(())
    }
}

impl std::fmt::Debug for SledStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SledStore")
            .field("db", &"sled::Db")
            .field("rooms", &self.rooms.len())
            .field("messages", &self.messages.len())
            .finish()
    }
}
