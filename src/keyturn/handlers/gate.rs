//! Bearer gate for the protected routes.
//!
//! Flow Overview:
//! 1) Read `Authorization: Bearer <token>` (scheme is case-insensitive).
//! 2) Verify signature, algorithm and expiry, then session liveness.
//! 3) Attach `AuthenticatedSession` to the request for the handlers.

use axum::{
    extract::{Extension, Request},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, error};
use uuid::Uuid;

use super::error::ApiError;
use crate::session::{SessionEngine, SessionError};

/// Session resolved from a verified access token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AuthenticatedSession {
    pub session_id: Uuid,
}

pub async fn require_session(
    Extension(engine): Extension<Arc<SessionEngine>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = extract_bearer_token(request.headers()) else {
        debug!("missing or malformed bearer token");
        return ApiError::Unauthorized.into_response();
    };

    match engine.verify_access_token(&token).await {
        Ok(session_id) => {
            request
                .extensions_mut()
                .insert(AuthenticatedSession { session_id });
            next.run(request).await
        }
        Err(err) if err.is_unauthenticated() => {
            debug!("bearer rejected: {err}");
            ApiError::Unauthorized.into_response()
        }
        Err(err) => {
            log_internal(&err);
            ApiError::Unauthorized.into_response()
        }
    }
}

fn log_internal(err: &SessionError) {
    match std::error::Error::source(err) {
        Some(source) => error!("failed to check session liveness: {err}: {source}"),
        None => error!("failed to check session liveness: {err}"),
    }
}

/// Token from an `Authorization` header, or `None` for any other scheme.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        assert_eq!(
            extract_bearer_token(&headers("Bearer abc")),
            Some("abc".to_string())
        );
        assert_eq!(
            extract_bearer_token(&headers("bearer abc")),
            Some("abc".to_string())
        );
        assert_eq!(
            extract_bearer_token(&headers("BEARER  abc ")),
            Some("abc".to_string())
        );
    }

    #[test]
    fn rejects_other_schemes_and_empty_tokens() {
        assert_eq!(extract_bearer_token(&headers("Basic abc")), None);
        assert_eq!(extract_bearer_token(&headers("Bearer")), None);
        assert_eq!(extract_bearer_token(&headers("Bearer   ")), None);
        assert_eq!(extract_bearer_token(&HeaderMap::new()), None);
    }
}
