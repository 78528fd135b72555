use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{debug, error, warn};

use super::message::ErrorBody;
use crate::storage::StoreError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("invalid {0} id")]
    InvalidId(&'static str),

    #[error("invalid request body")]
    InvalidBody(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("failed to upgrade to ws connection")]
    Upgrade(String),

    #[error("something went wrong")]
    Internal(#[source] StoreError),
}

impl ApiError {
    /// Map a storage failure, naming the missing `entity` on `NotFound`.
    pub fn from_store(entity: &'static str) -> impl FnOnce(StoreError) -> ApiError {
        move |err| match err {
            StoreError::NotFound => ApiError::NotFound(entity),
            other => ApiError::Internal(other),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidId(_) | ApiError::InvalidBody(_) | ApiError::Upgrade(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Internal(e) => error!("storage failure: {e}"),
            ApiError::Upgrade(e) => warn!("failed to upgrade connection: {e}"),
            ApiError::InvalidBody(detail) => debug!("rejected request body: {detail}"),
            _ => {}
        }

        let body = ErrorBody {
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
