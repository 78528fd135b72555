//! # askroom
//!
//! `askroom` is a real-time question-and-answer server. Users create rooms,
//! post questions into them, upvote questions and mark them as answered.
//! Clients subscribed to a room over a WebSocket receive live events as
//! questions are created, upvoted or answered.
//!
//! ## Core Modules
//!
//! - `broker`: subscription registry, notifier and live sessions.
//! - `storage`: the `Store` gateway over rooms and messages, backed by `sled`.
//! - `transport`: axum REST handlers and the WebSocket subscribe endpoint.
//! - `config`: loads server configuration from file and environment.
//! - `utils`: error type and logging setup.

pub mod broker;
pub mod config;
pub mod storage;
pub mod transport;
pub mod utils;
