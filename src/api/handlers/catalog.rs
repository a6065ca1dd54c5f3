use axum::{Extension, Json, response::IntoResponse};
use std::sync::Arc;

use crate::authz::{Authorizer, PermissionCatalog};
use crate::error::Error;

#[utoipa::path(
    get,
    path = "/v1/roles/modules",
    responses(
        (status = 200, description = "Modules, groups and permissions.", body = PermissionCatalog),
        (status = 401, description = "Missing or invalid bearer token."),
        (status = 403, description = "Caller may not read the catalog."),
    ),
    tag = "roles"
)]
pub async fn modules(
    Extension(authorizer): Extension<Arc<Authorizer>>,
) -> Result<impl IntoResponse, Error> {
    let catalog = authorizer.modules().await?;
    Ok(Json(catalog))
}
