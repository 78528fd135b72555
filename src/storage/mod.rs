//! The `storage` module is the gateway to persisted rooms and messages.
//!
//! Handlers only see the [`Store`] trait. The shipped implementation,
//! [`SledStore`], keeps everything in an embedded `sled` database.

pub mod error;
pub mod model;
pub mod sled_store;

pub use error::StoreError;
pub use model::{MessageId, MessageRecord, Room, RoomId};
pub use sled_store::SledStore;

/// Narrow query interface over rooms and messages.
///
/// Lookups of absent rows return [`StoreError::NotFound`].
pub trait Store: Send + Sync + 'static {
    fn create_room(&self, theme: &str) -> Result<RoomId, StoreError>;

    fn list_rooms(&self) -> Result<Vec<Room>, StoreError>;

    fn get_room(&self, id: RoomId) -> Result<Room, StoreError>;

    /// Fails with `NotFound` when the room does not exist.
    fn create_message(&self, room_id: RoomId, text: &str) -> Result<MessageId, StoreError>;

    /// Messages of a room in creation order.
    fn list_messages(&self, room_id: RoomId) -> Result<Vec<MessageRecord>, StoreError>;

    fn get_message(&self, id: MessageId) -> Result<MessageRecord, StoreError>;

    /// Atomically bumps the reaction count and returns the new value.
    fn react_to_message(&self, id: MessageId) -> Result<i64, StoreError>;

    fn mark_message_answered(&self, id: MessageId) -> Result<(), StoreError>;
}
