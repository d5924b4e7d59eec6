use axum::{
    extract::Extension,
    response::{IntoResponse, Json},
};
use std::sync::Arc;
use tracing::instrument;

use super::{
    error::ApiError,
    gate::AuthenticatedSession,
    types::{ErrorResponse, MessageResponse},
};
use crate::session::SessionEngine;

#[utoipa::path(
    get,
    path = "/auth/deauthorize",
    responses(
        (status = 200, description = "Every session of the bearer's subject revoked.", body = MessageResponse),
        (status = 401, description = "Missing, invalid or revoked bearer token.", body = ErrorResponse),
        (status = 500, description = "Internal failure.", body = ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
#[instrument(skip_all, fields(session_id = %session.session_id))]
pub async fn deauthorize(
    Extension(engine): Extension<Arc<SessionEngine>>,
    Extension(session): Extension<AuthenticatedSession>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = engine.subject_of(session.session_id).await?;
    engine.deauthorize_subject(user_id).await?;

    Ok(Json(MessageResponse {
        message: "user deauthorized".to_string(),
    }))
}
