use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use convo_core::CoreError;
use convo_types::api::ErrorBody;

/// An error response: a status plus a `{"message": ..}` body.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            // Forbidden is reported as a miss.
            CoreError::NotFound(_) | CoreError::Forbidden => {
                Self::new(StatusCode::NOT_FOUND, "Not found")
            }
            CoreError::BadRequest(message) => Self::new(StatusCode::BAD_REQUEST, message),
            CoreError::Validation(e) => Self::new(StatusCode::BAD_REQUEST, e.to_string()),
            CoreError::InvalidState(message) => Self::new(StatusCode::CONFLICT, message),
            err @ (CoreError::Delivery(_) | CoreError::Transaction(_) | CoreError::Store(_)) => {
                error!("request failed: {}", err);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                message: self.message,
            }),
        )
            .into_response()
    }
}
