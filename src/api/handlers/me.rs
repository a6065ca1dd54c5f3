//! Authenticated self-service endpoint.

use axum::{Extension, Json, response::IntoResponse};
use serde::Serialize;
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::AuthService;
use crate::error::Error;
use crate::security::token::Principal;

#[derive(Debug, Serialize, ToSchema)]
pub struct MeResponse {
    pub id: Uuid,
    pub username: String,
    pub company_id: Uuid,
    pub role_id: Uuid,
}

#[utoipa::path(
    get,
    path = "/v1/users/me",
    responses(
        (status = 200, description = "The authenticated user.", body = MeResponse),
        (status = 401, description = "Missing or invalid bearer token."),
        (status = 404, description = "The token's account no longer exists."),
    ),
    tag = "users"
)]
pub async fn get_me(
    Extension(auth): Extension<Arc<AuthService>>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, Error> {
    let user = auth.users.get_by_id(principal.id).await.map_err(|err| {
        error!("Failed to fetch user profile: {err}");
        Error::internal(err)
    })?;
    let Some(user) = user else {
        return Err(Error::NotFound);
    };

    Ok(Json(MeResponse {
        id: user.id,
        username: user.username,
        company_id: user.company_id,
        role_id: user.role_id,
    }))
}
