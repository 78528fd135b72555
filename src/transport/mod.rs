//! HTTP and WebSocket surface.
//!
//! REST handlers validate identifiers, call the [`Store`] and hand
//! notifications to the [`Notifier`]. `/subscribe/{room_id}` upgrades to a
//! WebSocket that is driven by a [`crate::broker::Session`].

pub mod error;
pub mod handlers;
pub mod message;
pub mod websocket;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::{HeaderName, Method, header};
use axum::routing::{get, patch, post};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::broker::{Dispatcher, Notifier, SubscriptionRegistry};
use crate::storage::Store;

pub use error::ApiError;
pub use websocket::handle_subscribe;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub notifier: Notifier,
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Build the state around a fresh registry. The returned dispatcher has to
    /// be spawned for notifications to go out.
    pub fn new(store: Arc<dyn Store>, shutdown: CancellationToken) -> (Self, Dispatcher) {
        let registry = Arc::new(SubscriptionRegistry::new());
        let (notifier, dispatcher) = Notifier::new(registry);
        let state = Self {
            store,
            notifier,
            shutdown,
        };
        (state, dispatcher)
    }

    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        self.notifier.registry()
    }
}

/// Build the application router.
///
/// Requests pass, outermost first, through request id assignment, tracing,
/// panic recovery and CORS before reaching a handler.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
            Method::PATCH,
        ])
        .allow_headers([
            header::ACCEPT,
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-csrf-token"),
        ])
        .expose_headers([header::LINK])
        .max_age(Duration::from_secs(300));

    Router::new()
        .route("/subscribe/{room_id}", get(handle_subscribe))
        .route(
            "/api/rooms",
            post(handlers::create_room).get(handlers::list_rooms),
        )
        .route(
            "/api/rooms/{room_id}/messages",
            post(handlers::create_message).get(handlers::list_messages),
        )
        .route(
            "/api/rooms/{room_id}/messages/{message_id}",
            get(handlers::get_message),
        )
        .route(
            "/api/rooms/{room_id}/messages/{message_id}/react",
            patch(handlers::react_to_message),
        )
        .route(
            "/api/rooms/{room_id}/messages/{message_id}/answer",
            patch(handlers::mark_message_answered),
        )
        .layer(cors)
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}

/// Serve HTTP and WebSocket traffic on `listener` until the state's shutdown
/// token is cancelled.
pub async fn start_server(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    let shutdown = state.shutdown.clone();
    if let Ok(addr) = listener.local_addr() {
        info!("listening on http://{addr}");
    }

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

#[cfg(test)]
mod websocket_tests;
