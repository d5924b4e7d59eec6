//! Issue and rotate session credentials.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Extension, Query,
    },
    response::{IntoResponse, Json},
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use super::{
    client::ClientContext,
    error::ApiError,
    gate::AuthenticatedSession,
    types::{CreateTokensQuery, ErrorResponse, TokensResponse, UpdateTokensRequest},
};
use crate::session::SessionEngine;

#[utoipa::path(
    get,
    path = "/auth/create-tokens",
    params(CreateTokensQuery),
    responses(
        (status = 200, description = "New access token and refresh token.", body = TokensResponse),
        (status = 400, description = "Missing or malformed user_id.", body = ErrorResponse),
        (status = 500, description = "Internal failure.", body = ErrorResponse),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn create_tokens(
    Extension(engine): Extension<Arc<SessionEngine>>,
    query: Result<Query<CreateTokensQuery>, QueryRejection>,
    client: ClientContext,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let user_id = match query.user_id.as_deref().map(str::trim) {
        None | Some("") => {
            return Err(ApiError::BadRequest(
                "user_id query parameter is required".to_string(),
            ))
        }
        Some(raw) => Uuid::parse_str(raw).map_err(|_| {
            ApiError::BadRequest("invalid user_id format (must be UUID)".to_string())
        })?,
    };

    let issued = engine
        .issue_session(user_id, &client.device_fingerprint, &client.network_origin)
        .await?;

    Ok(Json(TokensResponse::from(issued)))
}

#[utoipa::path(
    post,
    path = "/auth/update-tokens",
    request_body = UpdateTokensRequest,
    responses(
        (status = 200, description = "Rotated access token and refresh token.", body = TokensResponse),
        (status = 400, description = "Malformed body.", body = ErrorResponse),
        (status = 401, description = "Rotation refused.", body = ErrorResponse),
        (status = 500, description = "Internal failure.", body = ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
#[instrument(skip_all, fields(session_id = %session.session_id))]
pub async fn update_tokens(
    Extension(engine): Extension<Arc<SessionEngine>>,
    Extension(session): Extension<AuthenticatedSession>,
    client: ClientContext,
    payload: Result<Json<UpdateTokensRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    if request.refresh_token.is_empty() {
        return Err(ApiError::BadRequest("refresh_token is required".to_string()));
    }

    let issued = engine
        .rotate_session(
            session.session_id,
            &request.refresh_token,
            &client.device_fingerprint,
            &client.network_origin,
        )
        .await?;

    Ok(Json(TokensResponse::from(issued)))
}
