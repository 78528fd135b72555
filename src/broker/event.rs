//! Notification events
//!
//! Events are pushed to subscribers as `{"kind": ..., "value": ...}` JSON.
//! The room id on a [`Notification`] is routing information only and never
//! reaches the wire.

use serde::{Deserialize, Serialize};

use crate::storage::{MessageId, RoomId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Event {
    MessageCreated(MessageCreated),
    MessageReactionIncreased(MessageReactionIncreased),
    MessageAnswered(MessageAnswered),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageCreated {
    pub id: MessageId,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageReactionIncreased {
    pub id: MessageId,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageAnswered {
    pub id: MessageId,
}

impl Event {
    pub fn kind(&self) -> &'static str {
        match self {
            Event::MessageCreated(_) => "message_created",
            Event::MessageReactionIncreased(_) => "message_reaction_increased",
            Event::MessageAnswered(_) => "message_answered",
        }
    }
}

/// An event addressed to the subscribers of one room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub room_id: RoomId,
    pub event: Event,
}

impl Notification {
    pub fn new(room_id: RoomId, event: Event) -> Self {
        Self { room_id, event }
    }

    pub fn message_created(room_id: RoomId, id: MessageId, message: impl Into<String>) -> Self {
        Self::new(
            room_id,
            Event::MessageCreated(MessageCreated {
                id,
                message: message.into(),
            }),
        )
    }

    pub fn reaction_increased(room_id: RoomId, id: MessageId, count: i64) -> Self {
        Self::new(
            room_id,
            Event::MessageReactionIncreased(MessageReactionIncreased { id, count }),
        )
    }

    pub fn answered(room_id: RoomId, id: MessageId) -> Self {
        Self::new(room_id, Event::MessageAnswered(MessageAnswered { id }))
    }

    /// The JSON text frame sent to clients.
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.event)
    }
}
