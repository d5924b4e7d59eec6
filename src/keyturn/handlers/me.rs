use axum::{
    extract::Extension,
    response::{IntoResponse, Json},
};
use std::sync::Arc;

use super::{
    error::ApiError,
    gate::AuthenticatedSession,
    types::{ErrorResponse, UserIdResponse},
};
use crate::session::SessionEngine;

#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Subject owning the bearer's session.", body = UserIdResponse),
        (status = 401, description = "Missing, invalid or revoked bearer token.", body = ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn me(
    Extension(engine): Extension<Arc<SessionEngine>>,
    Extension(session): Extension<AuthenticatedSession>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = engine.subject_of(session.session_id).await?;
    Ok(Json(UserIdResponse { user_id }))
}
