//! Session endpoints: login, refresh, and the password-reset flow.

use axum::{Extension, Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::auth::{
    AuthService, AuthenticationResponse, LoginRequest, RefreshRequest, ResetPasswordOutcome,
    ResetPasswordRequest,
};
use crate::error::Error;

#[derive(Debug, Serialize, ToSchema)]
pub struct ResetPasswordResponse {
    pub status: ResetPasswordOutcome,
    pub message: &'static str,
}

#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session issued.", body = AuthenticationResponse),
        (status = 400, description = "Incorrect username or password."),
    ),
    tag = "auth"
)]
pub async fn login(
    Extension(auth): Extension<Arc<AuthService>>,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, Error> {
    let response = auth.login(&request).await?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/v1/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Session renewed.", body = AuthenticationResponse),
        (status = 400, description = "Invalid or expired refresh token."),
    ),
    tag = "auth"
)]
pub async fn refresh(
    Extension(auth): Extension<Arc<AuthService>>,
    Json(request): Json<RefreshRequest>,
) -> Result<impl IntoResponse, Error> {
    let response = auth.refresh(&request).await?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/v1/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Reset advanced one stage.", body = ResetPasswordResponse),
        (status = 400, description = "Wrong code or out-of-order request."),
        (status = 404, description = "No account matches the email."),
    ),
    tag = "auth"
)]
pub async fn reset_password(
    Extension(auth): Extension<Arc<AuthService>>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, Error> {
    let outcome = auth.reset_password(&request).await?;
    let message = match outcome {
        ResetPasswordOutcome::CodeSent => "reset code sent",
        ResetPasswordOutcome::CodeVerified => "reset code verified",
        ResetPasswordOutcome::Completed => "password updated",
    };
    Ok((
        StatusCode::OK,
        Json(ResetPasswordResponse {
            status: outcome,
            message,
        }),
    ))
}
