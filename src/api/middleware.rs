//! Authentication and authorization middleware.
//!
//! `authenticate` turns the `Authorization` header into a [`Principal`]
//! request extension; `authorize` checks that principal against the matched
//! route. They are layered separately so public routes can skip both and
//! self-service routes can require only authentication.

use axum::{
    Extension,
    extract::{MatchedPath, RawPathParams, Request},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::authz::Authorizer;
use crate::error::Error;
use crate::security::token::Principal;

pub async fn authenticate(
    Extension(authorizer): Extension<Arc<Authorizer>>,
    mut request: Request,
    next: Next,
) -> Result<Response, Error> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let principal = authorizer.check_auth(header)?;
    request.extensions_mut().insert(principal);

    Ok(next.run(request).await)
}

pub async fn authorize(
    Extension(authorizer): Extension<Arc<Authorizer>>,
    matched_path: MatchedPath,
    path_params: RawPathParams,
    request: Request,
    next: Next,
) -> Result<Response, Error> {
    let principal = request
        .extensions()
        .get::<Principal>()
        .cloned()
        .ok_or(Error::Unauthorized)?;

    // Route template, not the concrete URI, so rules match what was
    // registered ("/v1/drivers/{driver_id}").
    let path = matched_path.as_str().to_string();
    let method = request.method().as_str().to_string();

    // Path parameters shadow query parameters of the same name.
    let mut values: Vec<(String, String)> = path_params
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();
    if let Some(query) = request.uri().query() {
        values.extend(
            url::form_urlencoded::parse(query.as_bytes())
                .map(|(name, value)| (name.into_owned(), value.into_owned())),
        );
    }
    let lookup = move |name: &str| {
        values
            .iter()
            .find(|(candidate, _)| candidate == name)
            .map(|(_, value)| value.clone())
    };

    authorizer
        .has_access(principal.id, &path, &method, &lookup)
        .await?;

    Ok(next.run(request).await)
}
