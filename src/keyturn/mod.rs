use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    middleware,
    routing::{get, post},
    Extension, Router,
};
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::session::{
    Argon2SecretHasher, Hs512TokenCodec, NotificationDispatcher, PgSessionStore, SessionConfig,
    SessionEngine, WebhookNotifier,
};

pub mod db;
pub mod handlers;
mod openapi;
mod shutdown;

pub use openapi::ApiDoc;

use handlers::{deauthorize, health, me, tokens};

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, dsn: String, config: SessionConfig) -> Result<()> {
    let pool = db::connect(&dsn).await?;
    db::apply_schema(&pool).await?;

    let notifier = WebhookNotifier::new(&config).context("Failed to build webhook client")?;
    let (dispatcher, _worker) = NotificationDispatcher::spawn(Arc::new(notifier), &config);

    let hasher =
        Argon2SecretHasher::new(config.hash_cost()).context("Invalid secret hashing cost")?;
    let codec = Hs512TokenCodec::new(&config).context("Invalid access token settings")?;

    let engine = Arc::new(SessionEngine::new(
        Arc::new(PgSessionStore::new(pool)),
        Arc::new(hasher),
        Arc::new(codec),
        dispatcher,
    ));

    let app = router(engine).layer(
        ServiceBuilder::new()
            .layer(SetRequestHeaderLayer::if_not_present(
                HeaderName::from_static("x-request-id"),
                |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
            ))
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                "x-request-id",
            )))
            .layer(TraceLayer::new_for_http().make_span_with(make_span)),
    );

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown::signal())
    .await?;

    Ok(())
}

/// Routes with the engine attached. `/auth/update-tokens`, `/auth/deauthorize`
/// and `/auth/me` sit behind the bearer gate. Swagger UI is mounted at
/// `/swagger` over the document at `/api-docs/openapi.json`.
pub fn router(engine: Arc<SessionEngine>) -> Router {
    let protected = Router::new()
        .route("/auth/update-tokens", post(tokens::update_tokens))
        .route("/auth/deauthorize", get(deauthorize::deauthorize))
        .route("/auth/me", get(me::me))
        .route_layer(middleware::from_fn(handlers::require_session));

    Router::new()
        .route("/health", get(health::health).options(health::health))
        .route("/auth/create-tokens", get(tokens::create_tokens))
        .merge(protected)
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(Extension(engine))
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
