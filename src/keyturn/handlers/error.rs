//! Mapping from engine failures to HTTP answers.
//!
//! Authentication failures all collapse to the same 401 body so a caller
//! cannot tell which check failed. Internal failures are logged here and
//! answered with a generic 500.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use tracing::error;

use super::types::ErrorResponse;
use crate::session::SessionError;

pub const UNAUTHORIZED: &str = "unauthorized";
pub const INTERNAL: &str = "internal server error";

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized,
    Internal,
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        if err.is_unauthenticated() {
            return Self::Unauthorized;
        }
        match std::error::Error::source(&err) {
            Some(source) => error!("session engine failure: {err}: {source}"),
            None => error!("session engine failure: {err}"),
        }
        Self::Internal
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, UNAUTHORIZED.to_string()),
            Self::Internal => (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_string()),
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
