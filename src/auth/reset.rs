//! Password reset: a short-lived, cache-backed state machine keyed by email.
//!
//! One request surface drives three stages, dispatched on the cached state:
//! no pending state sends a fresh code, a pending code verifies the one the
//! request carries, and a verified state accepts a new password. State lives
//! only in the cache and evaporates after [`RESET_STATE_TTL`], so an
//! abandoned reset needs no cleanup.

use rand::Rng;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{AuthService, Mail};
use crate::cache::{cache_key, get_object, set_object};
use crate::error::Error;

/// A reset attempt must finish within this window.
const RESET_STATE_TTL: Duration = Duration::from_secs(10 * 60);

const RESET_EMAIL_SUBJECT: &str = "Your password reset code";

const RESET_EMAIL_TEMPLATE: &str = r"<html>
  <body>
    <p>We received a request to reset your password.</p>
    <p>Your reset code is: <strong>{reset_code}</strong></p>
    <p>The code expires in 10 minutes. If you did not request this, you can
    safely ignore this email.</p>
  </body>
</html>";

#[derive(Debug, Deserialize, ToSchema)]
pub struct ResetPasswordRequest {
    pub email: String,
    #[serde(default)]
    pub reset_code: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Which stage the request advanced to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResetPasswordOutcome {
    CodeSent,
    CodeVerified,
    Completed,
}

#[derive(Debug, Serialize, Deserialize)]
struct ResetPasswordState {
    user_id: Uuid,
    email: String,
    reset_code: String,
    verified: bool,
}

/// A uniform 4-digit code from the OS entropy source, zero padded.
fn generate_reset_code() -> String {
    let code: u16 = OsRng.gen_range(0..10_000);
    format!("{code:04}")
}

impl AuthService {
    /// Advance a password reset by one stage.
    ///
    /// Dispatch is driven by the cached state, never by the request shape:
    /// no pending state sends a fresh code, a request code verifies against
    /// the pending one, and a verified state plus a new password completes.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] when no account matches the email.
    /// - [`Error::Validation`] on a wrong code, and on requests that fit no
    ///   stage (a bare email while a code is already pending).
    /// - [`Error::Internal`] on store, cache, mail, or hashing failures.
    pub async fn reset_password(
        &self,
        request: &ResetPasswordRequest,
    ) -> Result<ResetPasswordOutcome, Error> {
        let key = cache_key("reset-password", &[&request.email]);
        let state: Option<ResetPasswordState> =
            get_object(&*self.cache, &key).await.map_err(|err| {
                error!("Failed to read reset state: {err}");
                Error::internal(err)
            })?;

        // No pending reset: never started, expired, or just completed. Any
        // request restarts the flow from scratch.
        let Some(mut state) = state else {
            return self.send_reset_code(&key, &request.email).await;
        };

        let code = request.reset_code.as_deref().unwrap_or_default();
        if !code.is_empty() {
            return self.verify_reset_code(&key, &mut state, code).await;
        }

        let password = request.password.as_deref().unwrap_or_default();
        if state.verified && !password.is_empty() {
            return self.complete_reset(&key, &state, password).await;
        }

        Err(Error::validation("email", "something went wrong"))
    }

    async fn send_reset_code(&self, key: &str, email: &str) -> Result<ResetPasswordOutcome, Error> {
        let user = self.users.get_by_username(email).await.map_err(|err| {
            error!("Failed to look up user for reset: {err}");
            Error::internal(err)
        })?;
        let Some(user) = user else {
            return Err(Error::NotFound);
        };

        let state = ResetPasswordState {
            user_id: user.id,
            email: email.to_string(),
            reset_code: generate_reset_code(),
            verified: false,
        };

        let mail = Mail {
            to: vec![email.to_string()],
            subject: RESET_EMAIL_SUBJECT.to_string(),
            body: RESET_EMAIL_TEMPLATE.replace("{reset_code}", &state.reset_code),
        };
        // The SMTP transport blocks on the network; keep it off the async
        // workers. Delivered before the state is persisted, so a failed send
        // leaves the flow restartable.
        let mailer = Arc::clone(&self.mailer);
        tokio::task::spawn_blocking(move || mailer.send(&mail))
            .await
            .map_err(|err| {
                error!("Mailer task failed: {err}");
                Error::internal(err)
            })?
            .map_err(|err| {
                error!("Failed to send reset email: {err}");
                Error::internal(err)
            })?;

        set_object(&*self.cache, key, &state, RESET_STATE_TTL)
            .await
            .map_err(|err| {
                error!("Failed to persist reset state: {err}");
                Error::internal(err)
            })?;

        Ok(ResetPasswordOutcome::CodeSent)
    }

    /// The code is compared on every attempt, verified or not, so a wrong
    /// code never rides on an earlier verification.
    async fn verify_reset_code(
        &self,
        key: &str,
        state: &mut ResetPasswordState,
        code: &str,
    ) -> Result<ResetPasswordOutcome, Error> {
        if state.reset_code != code {
            return Err(Error::validation("reset_code", "reset code is not valid"));
        }

        state.verified = true;
        set_object(&*self.cache, key, &*state, RESET_STATE_TTL)
            .await
            .map_err(|err| {
                error!("Failed to persist reset state: {err}");
                Error::internal(err)
            })?;

        Ok(ResetPasswordOutcome::CodeVerified)
    }

    async fn complete_reset(
        &self,
        key: &str,
        state: &ResetPasswordState,
        password: &str,
    ) -> Result<ResetPasswordOutcome, Error> {
        let new_hash = self.hasher.hash(password).map_err(|err| {
            error!("Failed to hash new password: {err}");
            Error::internal(err)
        })?;

        let updated = self
            .users
            .update_password(state.user_id, &new_hash)
            .await
            .map_err(|err| {
                error!("Failed to update password: {err}");
                Error::internal(err)
            })?;
        if !updated {
            // The account disappeared mid-reset.
            return Err(Error::NotFound);
        }

        // The password is already changed; a stale state entry only expires.
        if let Err(err) = self.cache.delete(&[key]).await {
            warn!("Failed to delete reset state: {err}");
        }

        Ok(ResetPasswordOutcome::Completed)
    }
}
