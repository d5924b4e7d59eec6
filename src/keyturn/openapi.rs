use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};

use super::handlers::{
    deauthorize, health, me, tokens,
    types::{ErrorResponse, MessageResponse, TokensResponse, UpdateTokensRequest, UserIdResponse},
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        tokens::create_tokens,
        tokens::update_tokens,
        deauthorize::deauthorize,
        me::me,
    ),
    components(schemas(
        health::Health,
        TokensResponse,
        UpdateTokensRequest,
        MessageResponse,
        UserIdResponse,
        ErrorResponse,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "auth", description = "Session credential issue, rotation and revocation"),
        (name = "health", description = "Liveness"),
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}
