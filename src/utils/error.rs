//! Crate-level error type used by the binary and server bootstrap.

use thiserror::Error;

use crate::storage::StoreError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
