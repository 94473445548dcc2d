//! HTTP-facing error type and rejection recovery

use std::convert::Infallible;

use thiserror::Error;
use tracing::error;
use warp::http::StatusCode;
use warp::{Rejection, Reply};

use crate::models::StatusMessage;
use crate::store::StoreError;

/// Errors returned by chat and message operations
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Chat not found")]
    ChatNotFound,

    #[error("Message not found")]
    MessageNotFound,

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("Payload too large")]
    PayloadTooLarge,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::ChatNotFound | ApiError::MessageNotFound => StatusCode::NOT_FOUND,
            ApiError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to clients; internal details stay in the logs
    pub fn public_message(&self) -> String {
        match self {
            ApiError::Store(StoreError::NotFound(_)) => "Chat not found".to_string(),
            ApiError::Store(_) => "Server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl warp::reject::Reject for ApiError {}

impl From<ApiError> for Rejection {
    fn from(err: ApiError) -> Self {
        warp::reject::custom(err)
    }
}

/// Turn any rejection into a status code and a `{ "message": ... }` body
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, message) = if let Some(api_error) = err.find::<ApiError>() {
        if api_error.status_code().is_server_error() {
            error!(error = %api_error, "request failed");
        }
        (api_error.status_code(), api_error.public_message())
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found".to_string())
    } else if let Some(e) = err.find::<warp::filters::cors::CorsForbidden>() {
        (StatusCode::FORBIDDEN, e.to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".to_string())
    } else {
        error!(rejection = ?err, "unhandled rejection");
        (StatusCode::INTERNAL_SERVER_ERROR, "Server error".to_string())
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&StatusMessage::new(message)),
        status,
    ))
}
