//! Credential verification and session issuance.
//!
//! Login and refresh both end in a fresh access/refresh pair; the response
//! also carries the caller's effective permissions so clients can shape their
//! UI without a second round trip. Credential failures are deliberately
//! indistinguishable: an unknown username and a wrong password produce the
//! same validation error.

use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, warn};
use utoipa::ToSchema;

use crate::cache::ObjectCache;
use crate::error::Error;
use crate::security::hash::CredentialHasher;
use crate::security::token::{Principal, TokenService};
use crate::store::{Permission, UserStore};

pub mod mailer;
pub mod reset;

pub use mailer::{LogMailer, Mail, Mailer, SmtpConfig, SmtpMailer};
pub use reset::{ResetPasswordOutcome, ResetPasswordRequest};

const BAD_CREDENTIALS: &str = "incorrect username or password";

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, serde::Serialize, ToSchema)]
pub struct AuthenticationResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub permissions: Vec<Permission>,
}

/// Login, refresh, and password reset against the user store.
pub struct AuthService {
    pub(crate) users: Arc<dyn UserStore>,
    pub(crate) permissions: Arc<dyn crate::store::PermissionStore>,
    pub(crate) cache: Arc<dyn ObjectCache>,
    pub(crate) mailer: Arc<dyn Mailer>,
    pub(crate) hasher: CredentialHasher,
    pub(crate) tokens: Arc<TokenService>,
}

impl AuthService {
    #[must_use]
    pub fn new(
        users: Arc<dyn UserStore>,
        permissions: Arc<dyn crate::store::PermissionStore>,
        cache: Arc<dyn ObjectCache>,
        mailer: Arc<dyn Mailer>,
        hasher: CredentialHasher,
        tokens: Arc<TokenService>,
    ) -> Self {
        Self {
            users,
            permissions,
            cache,
            mailer,
            hasher,
            tokens,
        }
    }

    /// Verify a username/password pair and issue a session.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] on `username` for any credential mismatch,
    ///   whether the account exists or not.
    /// - [`Error::Internal`] on store or KDF failure.
    pub async fn login(&self, request: &LoginRequest) -> Result<AuthenticationResponse, Error> {
        let user = self
            .users
            .get_by_username(&request.username)
            .await
            .map_err(|err| {
                error!("Failed to look up user: {err}");
                Error::internal(err)
            })?;
        let Some(user) = user else {
            return Err(Error::validation("username", BAD_CREDENTIALS));
        };

        let matches = self
            .hasher
            .verify(&request.password, &user.password_hash)
            .map_err(|err| {
                error!("Failed to verify password hash: {err}");
                Error::internal(err)
            })?;
        if !matches {
            return Err(Error::validation("username", BAD_CREDENTIALS));
        }

        let principal = Principal {
            id: user.id,
            username: user.username,
            company_id: user.company_id,
        };
        self.issue_session(&principal).await
    }

    /// Exchange a refresh token for a new session.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] on `token` when the refresh token is invalid or
    /// expired; the exact reason is reflected in the message.
    pub async fn refresh(&self, request: &RefreshRequest) -> Result<AuthenticationResponse, Error> {
        let principal = self
            .tokens
            .verify(&request.refresh_token, true)
            .map_err(|err| match Error::from(err) {
                Error::ExpiredToken => Error::validation("token", "expired refresh token"),
                _ => Error::validation("token", "invalid refresh token"),
            })?;

        self.issue_session(&principal).await
    }

    async fn issue_session(&self, principal: &Principal) -> Result<AuthenticationResponse, Error> {
        let pair = self.tokens.issue(principal).map_err(|err| {
            error!("Failed to issue tokens: {err}");
            Error::internal(err)
        })?;

        // The permission list is advisory for clients; enforcement happens
        // per request, so a failed read degrades to an empty list.
        let permissions = self
            .permissions
            .permissions_for_user(principal.id)
            .await
            .unwrap_or_else(|err| {
                warn!("Failed to list permissions for session: {err}");
                Vec::new()
            });

        Ok(AuthenticationResponse {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            permissions,
        })
    }
}
