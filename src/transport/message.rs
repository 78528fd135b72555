//! Request and response bodies of the REST API.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::storage::{MessageRecord, Room};

#[derive(Debug, Deserialize, Serialize)]
pub struct CreateRoomRequest {
    pub theme: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CreateMessageRequest {
    pub message: String,
}

/// Returned by both create endpoints.
#[derive(Debug, Deserialize, Serialize)]
pub struct CreatedResponse {
    pub id: Uuid,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RoomsResponse {
    pub rooms: Vec<Room>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct MessagesResponse {
    pub messages: Vec<MessageRecord>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ReactionResponse {
    pub count: i64,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ErrorBody {
    pub error: String,
}
