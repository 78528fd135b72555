//! REST handlers for rooms and messages.
//!
//! Identifiers are validated before the store is touched, and notifications
//! are dispatched only after the mutation has been persisted.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use tracing::info;
use uuid::Uuid;

use super::AppState;
use super::error::ApiError;
use super::message::{
    CreateMessageRequest, CreateRoomRequest, CreatedResponse, MessagesResponse, ReactionResponse,
    RoomsResponse,
};
use crate::broker::Notification;
use crate::storage::{MessageId, MessageRecord, RoomId};

pub(crate) fn parse_room_id(raw: &str) -> Result<RoomId, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::InvalidId("room"))
}

fn parse_message_id(raw: &str) -> Result<MessageId, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::InvalidId("message"))
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::InvalidBody(rejection.body_text()))
}

/// Look up a message and make sure it lives in `room_id`.
fn message_in_room(
    state: &AppState,
    room_id: RoomId,
    message_id: MessageId,
) -> Result<MessageRecord, ApiError> {
    let record = state
        .store
        .get_message(message_id)
        .map_err(ApiError::from_store("message"))?;
    if record.room_id != room_id {
        return Err(ApiError::NotFound("message"));
    }
    Ok(record)
}

pub async fn create_room(
    State(state): State<AppState>,
    payload: Result<Json<CreateRoomRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let request = body(payload)?;
    let id = state
        .store
        .create_room(&request.theme)
        .map_err(ApiError::Internal)?;

    info!(room_id = %id, theme = %request.theme, "room created");
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

pub async fn list_rooms(State(state): State<AppState>) -> Result<Json<RoomsResponse>, ApiError> {
    let rooms = state.store.list_rooms().map_err(ApiError::Internal)?;
    Ok(Json(RoomsResponse { rooms }))
}

pub async fn create_message(
    State(state): State<AppState>,
    Path(raw_room_id): Path<String>,
    payload: Result<Json<CreateMessageRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let room_id = parse_room_id(&raw_room_id)?;
    state
        .store
        .get_room(room_id)
        .map_err(ApiError::from_store("room"))?;
    let request = body(payload)?;

    let id = state
        .store
        .create_message(room_id, &request.message)
        .map_err(ApiError::from_store("room"))?;

    state
        .notifier
        .dispatch(Notification::message_created(room_id, id, request.message));
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

pub async fn list_messages(
    State(state): State<AppState>,
    Path(raw_room_id): Path<String>,
) -> Result<Json<MessagesResponse>, ApiError> {
    let room_id = parse_room_id(&raw_room_id)?;
    let messages = state
        .store
        .list_messages(room_id)
        .map_err(ApiError::from_store("room"))?;
    Ok(Json(MessagesResponse { messages }))
}

pub async fn get_message(
    State(state): State<AppState>,
    Path((raw_room_id, raw_message_id)): Path<(String, String)>,
) -> Result<Json<MessageRecord>, ApiError> {
    let room_id = parse_room_id(&raw_room_id)?;
    let message_id = parse_message_id(&raw_message_id)?;
    message_in_room(&state, room_id, message_id).map(Json)
}

pub async fn react_to_message(
    State(state): State<AppState>,
    Path((raw_room_id, raw_message_id)): Path<(String, String)>,
) -> Result<Json<ReactionResponse>, ApiError> {
    let room_id = parse_room_id(&raw_room_id)?;
    let message_id = parse_message_id(&raw_message_id)?;
    message_in_room(&state, room_id, message_id)?;

    let count = state
        .store
        .react_to_message(message_id)
        .map_err(ApiError::from_store("message"))?;

    state
        .notifier
        .dispatch(Notification::reaction_increased(room_id, message_id, count));
    Ok(Json(ReactionResponse { count }))
}

pub async fn mark_message_answered(
    State(state): State<AppState>,
    Path((raw_room_id, raw_message_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let room_id = parse_room_id(&raw_room_id)?;
    let message_id = parse_message_id(&raw_message_id)?;
    message_in_room(&state, room_id, message_id)?;

    state
        .store
        .mark_message_answered(message_id)
        .map_err(ApiError::from_store("message"))?;

    state
        .notifier
        .dispatch(Notification::answered(room_id, message_id));
    Ok(StatusCode::NO_CONTENT)
}
