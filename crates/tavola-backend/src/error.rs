use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tavola_types::api::ApiMessage;
use thiserror::Error;

/// Handler failure, rendered as `{"detail": "..."}` the way the coursework
/// service reports errors.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(ApiMessage::detail(self.to_string()))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
