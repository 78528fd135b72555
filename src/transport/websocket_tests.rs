use super::{AppState, router, start_server};
use crate::storage::{RoomId, SledStore, Store};
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct Server {
    addr: String,
    state: AppState,
    store: Arc<SledStore>,
    shutdown: CancellationToken,
}

async fn setup_server() -> Server {
    let store = Arc::new(SledStore::temporary().expect("temporary store"));
    let shutdown = CancellationToken::new();
    let (state, dispatcher) = AppState::new(store.clone(), shutdown.clone());
    tokio::spawn(dispatcher.run(shutdown.clone()));

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().unwrap().to_string();
    tokio::spawn(start_server(listener, state.clone()));

    Server {
        addr,
        state,
        store,
        shutdown,
    }
}

impl Server {
    async fn subscribe(&self, room: RoomId) -> Client {
        let url = format!("ws://{}/subscribe/{room}", self.addr);
        let (ws, _) = connect_async(url).await.expect("websocket handshake failed");
        ws
    }

    async fn wait_for_subscribers(&self, room: RoomId, expected: usize) {
        let registry = self.state.registry().clone();
        tokio::time::timeout(Duration::from_secs(2), async move {
            while registry.subscriber_count(room) != expected {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("room never reached {expected} subscribers"));
    }

    async fn post_message(&self, room: RoomId, text: &str) -> String {
        let request = Request::builder()
            .method(Method::POST)
            .uri(format!("/api/rooms/{room}/messages"))
            .header("content-type", "application/json")
            .body(Body::from(json!({ "message": text }).to_string()))
            .unwrap();
        let response = router(self.state.clone()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        value["id"].as_str().unwrap().to_string()
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn next_json(ws: &mut Client) -> serde_json::Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("connection closed")
            .expect("websocket error");
        if let WsMessage::Text(text) = msg {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

async fn assert_silent(ws: &mut Client) {
    let outcome = tokio::time::timeout(Duration::from_millis(150), ws.next()).await;
    assert!(outcome.is_err(), "unexpected frame: {outcome:?}");
}

#[tokio::test]
async fn test_both_subscribers_receive_message_created_once() {
    let server = setup_server().await;
    let room = server.store.create_room("Go internals").unwrap();

    let mut a = server.subscribe(room).await;
    let mut b = server.subscribe(room).await;
    server.wait_for_subscribers(room, 2).await;

    let id = server.post_message(room, "Why is my goroutine leaking?").await;
    let expected = json!({
        "kind": "message_created",
        "value": { "id": id, "message": "Why is my goroutine leaking?" }
    });

    assert_eq!(next_json(&mut a).await, expected);
    assert_eq!(next_json(&mut b).await, expected);
    assert_silent(&mut a).await;
    assert_silent(&mut b).await;
}

#[tokio::test]
async fn test_disconnected_subscriber_is_removed() {
    let server = setup_server().await;
    let room = server.store.create_room("churn").unwrap();

    let mut a = server.subscribe(room).await;
    let mut b = server.subscribe(room).await;
    server.wait_for_subscribers(room, 2).await;

    a.close(None).await.unwrap();
    drop(a);
    server.wait_for_subscribers(room, 1).await;

    server.post_message(room, "still there?").await;
    assert_eq!(next_json(&mut b).await["value"]["message"], "still there?");
}

#[tokio::test]
async fn test_client_frames_are_ignored() {
    let server = setup_server().await;
    let room = server.store.create_room("chatty").unwrap();

    let mut ws = server.subscribe(room).await;
    server.wait_for_subscribers(room, 1).await;
    ws.send(WsMessage::Text("hello server".into())).await.unwrap();

    server.post_message(room, "after chatter").await;
    assert_eq!(next_json(&mut ws).await["kind"], "message_created");
    assert_eq!(server.state.registry().subscriber_count(room), 1);
}

#[tokio::test]
async fn test_messages_arrive_in_publish_order() {
    let server = setup_server().await;
    let room = server.store.create_room("ordering").unwrap();

    let mut ws = server.subscribe(room).await;
    server.wait_for_subscribers(room, 1).await;

    for i in 0..10 {
        server.post_message(room, &format!("question {i}")).await;
    }
    for i in 0..10 {
        assert_eq!(
            next_json(&mut ws).await["value"]["message"],
            format!("question {i}")
        );
    }
}

#[tokio::test]
async fn test_subscribe_to_unknown_room_is_rejected() {
    let server = setup_server().await;
    let url = format!("ws://{}/subscribe/{}", server.addr, uuid::Uuid::new_v4());

    match connect_async(url).await {
        Err(tokio_tungstenite::tungstenite::Error::Http(response)) => {
            assert_eq!(response.status().as_u16(), 404);
        }
        other => panic!("expected an HTTP 404 rejection, got {other:?}"),
    }
    assert_eq!(server.state.registry().room_count(), 0);
}

#[tokio::test]
async fn test_shutdown_closes_sessions() {
    let server = setup_server().await;
    let room = server.store.create_room("closing time").unwrap();

    let mut ws = server.subscribe(room).await;
    server.wait_for_subscribers(room, 1).await;

    server.shutdown.cancel();
    server.wait_for_subscribers(room, 0).await;

    let end = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match ws.next().await {
                None | Some(Err(_)) | Some(Ok(WsMessage::Close(_))) => break,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;
    assert!(end.is_ok(), "connection stayed open after shutdown");
}
