//! `/subscribe/{room_id}`
//!
//! The room is validated before the upgrade is accepted, so a bad id or an
//! unknown room never reaches the registry. After a successful upgrade the
//! socket is split and handed to a [`Session`], which owns it until the
//! session ends.

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use futures_util::future;
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, warn};

use super::AppState;
use super::error::ApiError;
use super::handlers::parse_room_id;
use crate::broker::Session;
use crate::storage::RoomId;

pub async fn handle_subscribe(
    State(state): State<AppState>,
    Path(raw_room_id): Path<String>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, ApiError> {
    let room_id = parse_room_id(&raw_room_id)?;
    state
        .store
        .get_room(room_id)
        .map_err(ApiError::from_store("room"))?;

    let upgrade = upgrade.map_err(|rejection| ApiError::Upgrade(rejection.body_text()))?;

    Ok(upgrade
        .on_failed_upgrade(move |e| warn!(%room_id, "failed to upgrade connection: {e}"))
        .on_upgrade(move |socket| serve_session(state, room_id, socket)))
}

/// Run one subscriber connection to completion.
pub async fn serve_session(state: AppState, room_id: RoomId, socket: WebSocket) {
    let session = Session::activate(state.registry().clone(), room_id, &state.shutdown);

    let (sender, receiver) = socket.split();
    let sink = sender.with(|frame: String| {
        future::ready(Ok::<_, axum::Error>(Message::Text(frame.into())))
    });
    // a close frame or a read error ends the session like a dropped connection
    let inbound = receiver.take_while(|incoming| {
        future::ready(matches!(incoming, Ok(msg) if !matches!(msg, Message::Close(_))))
    });

    let cause = session.run(sink, inbound).await;
    debug!(
        %room_id,
        %cause,
        remaining = state.registry().subscriber_count(room_id),
        "subscriber left room"
    );
}
