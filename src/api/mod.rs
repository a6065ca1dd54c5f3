//! HTTP surface: router assembly, server startup, and the error-to-status
//! mapping.

use anyhow::{Context, Result, anyhow};
use axum::{
    Extension, Json, Router,
    body::Body,
    extract::MatchedPath,
    http::{
        HeaderName, HeaderValue, Method, Request, StatusCode,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    middleware::from_fn,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use secrecy::SecretString;
use serde_json::json;
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{Span, info, info_span};
use ulid::Ulid;
use url::Url;
use uuid::Uuid;

use crate::auth::{AuthService, LogMailer, Mailer, SmtpConfig, SmtpMailer};
use crate::authz::Authorizer;
use crate::cache::{MemoryCache, ObjectCache, RedisCache};
use crate::error::Error;
use crate::security::hash::{CredentialHasher, HashParams};
use crate::security::token::TokenService;
use crate::store::{PgPermissionStore, PgUserStore};

pub(crate) mod handlers;
pub(crate) mod middleware;
mod openapi;

pub use openapi::openapi;

/// Everything the server needs, assembled by the CLI layer.
pub struct ServerConfig {
    pub port: u16,
    pub dsn: String,
    pub redis_url: Option<String>,
    pub jwt_secret: SecretString,
    pub admin_role_id: Uuid,
    pub hash: HashParams,
    pub smtp: Option<SmtpConfig>,
    pub frontend_base_url: Option<String>,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::Unauthorized | Error::InvalidToken | Error::ExpiredToken => {
                StatusCode::UNAUTHORIZED
            }
            Error::Forbidden => StatusCode::FORBIDDEN,
            Error::Validation { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = match &self {
            Error::Validation { field, message } => json!({
                "errors": [{ "field": field, "message": message }],
            }),
            // Internal sources never cross the boundary.
            other => json!({ "error": other.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

/// Connect the backing services and run the server until shutdown.
///
/// # Errors
///
/// Returns an error if any dependency cannot be initialized or the listener
/// cannot bind.
pub async fn serve(config: ServerConfig) -> Result<()> {
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&config.dsn)
        .await
        .context("Failed to connect to database")?;

    let cache: Arc<dyn ObjectCache> = match &config.redis_url {
        Some(url) => Arc::new(RedisCache::connect(url).await?),
        None => {
            info!("No redis url configured, using the in-process cache");
            Arc::new(MemoryCache::new())
        }
    };

    let mailer: Arc<dyn Mailer> = match &config.smtp {
        Some(smtp) => Arc::new(SmtpMailer::new(smtp)?),
        None => Arc::new(LogMailer),
    };

    let tokens = Arc::new(
        TokenService::new(config.jwt_secret).context("Failed to initialize token signing")?,
    );
    let users = Arc::new(PgUserStore::new(pool.clone()));
    let permissions = Arc::new(PgPermissionStore::new(pool, config.admin_role_id));

    let authorizer = Arc::new(Authorizer::new(
        permissions.clone(),
        cache.clone(),
        tokens.clone(),
    ));
    let auth = Arc::new(AuthService::new(
        users,
        permissions,
        cache,
        mailer,
        CredentialHasher::new(config.hash),
        tokens,
    ));

    let mut cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST]);
    if let Some(base_url) = &config.frontend_base_url {
        cors = cors
            .allow_origin(AllowOrigin::exact(frontend_origin(base_url)?))
            .allow_credentials(true);
    }

    let app = router()
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(authorizer))
                .layer(Extension(auth)),
        );

    let listener = TcpListener::bind(format!("::0:{}", config.port)).await?;

    info!("Listening on [::]:{}", config.port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {err}");
            }
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

/// Assemble the route tree. Session endpoints are public; everything under
/// the authenticated group carries a verified principal, and the authorized
/// group additionally passes a permission check.
#[must_use]
pub fn router() -> Router {
    let public = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/openapi.json", get(openapi::serve_openapi))
        .route("/v1/auth/login", post(handlers::auth::login))
        .route("/v1/auth/refresh", post(handlers::auth::refresh))
        .route(
            "/v1/auth/reset-password",
            post(handlers::auth::reset_password),
        );

    let authenticated = Router::new()
        .route("/v1/users/me", get(handlers::me::get_me))
        .route_layer(from_fn(middleware::authenticate));

    let authorized = Router::new()
        .route("/v1/roles/modules", get(handlers::catalog::modules))
        .route_layer(from_fn(middleware::authorize))
        .route_layer(from_fn(middleware::authenticate));

    public.merge(authenticated).merge(authorized)
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

fn frontend_origin(frontend_base_url: &str) -> Result<HeaderValue> {
    let parsed = Url::parse(frontend_base_url)
        .with_context(|| format!("Invalid frontend base URL: {frontend_base_url}"))?;
    let host = parsed.host_str().ok_or_else(|| {
        anyhow!("Frontend base URL must include a valid host: {frontend_base_url}")
    })?;
    let port = parsed
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));
    let origin = format!("{}://{}{}", parsed.scheme(), host, port);
    HeaderValue::from_str(&origin).context("Failed to build frontend origin header")
}
