//! Generated OpenAPI document, served at `/openapi.json` and printed by the
//! `openapi` CLI action.

use axum::{Json, response::IntoResponse};
use utoipa::OpenApi;

use super::handlers::{auth, catalog, health, me};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        auth::login,
        auth::refresh,
        auth::reset_password,
        catalog::modules,
        me::get_me,
    ),
    components(schemas(
        crate::auth::LoginRequest,
        crate::auth::RefreshRequest,
        crate::auth::AuthenticationResponse,
        crate::auth::ResetPasswordRequest,
        crate::auth::ResetPasswordOutcome,
        crate::authz::PermissionCatalog,
        crate::authz::CatalogModule,
        crate::authz::CatalogGroup,
        crate::store::Permission,
        crate::store::CatalogPermissionRecord,
        auth::ResetPasswordResponse,
        me::MeResponse,
    )),
    tags(
        (name = "auth", description = "Login, refresh and password reset"),
        (name = "roles", description = "Permission catalog"),
        (name = "users", description = "Authenticated self-service"),
        (name = "health", description = "Liveness"),
    ),
    info(
        title = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        description = env!("CARGO_PKG_DESCRIPTION"),
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

pub(crate) async fn serve_openapi() -> impl IntoResponse {
    Json(openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_info_from_cargo() {
        let spec = openapi();
        assert_eq!(spec.info.title, env!("CARGO_PKG_NAME"));
        assert_eq!(spec.info.version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn openapi_documents_every_route() {
        let spec = openapi();
        for path in [
            "/health",
            "/v1/auth/login",
            "/v1/auth/refresh",
            "/v1/auth/reset-password",
            "/v1/roles/modules",
            "/v1/users/me",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
