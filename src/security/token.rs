//! HS256 session tokens.
//!
//! Tokens are compact JWTs signed with a symmetric secret. Each login issues
//! an access/refresh pair; the `is_refresh_token` claim keeps the two
//! interchangeable only by forgery, and expiry is the sole termination
//! mechanism (no server-side revocation). Claims carry the minimal
//! [`Principal`] and never roles or permissions, so permission edits take
//! effect without re-issuing tokens.

use base64ct::{Base64UrlUnpadded, Encoding};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

/// Minimum length of the signing secret, in characters.
pub const MIN_SECRET_LENGTH: usize = 32;

const ACCESS_TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);
const REFRESH_TOKEN_TTL: Duration = Duration::from_secs(2 * 24 * 60 * 60);

type HmacSha256 = Hmac<Sha256>;

/// Verified identity attached to a request after token validation.
///
/// Immutable once issued; reconstructed from store records at login, never
/// trusted from client input beyond the verified token payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: Uuid,
    pub username: String,
    pub company_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct Header {
    alg: String,
    typ: String,
}

impl Header {
    fn hs256() -> Self {
        Self {
            alg: "HS256".to_string(),
            typ: "JWT".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct Claims {
    exp: i64,
    iat: i64,
    jti: String,
    is_refresh_token: bool,
    user: Principal,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid jwt token")]
    Invalid,
    #[error("expired jwt token")]
    Expired,
    #[error("invalid key size: must be at least {MIN_SECRET_LENGTH} characters")]
    WeakSecret,
    #[error("invalid json")]
    Json(#[from] serde_json::Error),
}

fn b64e_json<T: Serialize>(value: &T) -> Result<String, TokenError> {
    let json = serde_json::to_vec(value)?;
    Ok(Base64UrlUnpadded::encode_string(&json))
}

fn b64d_json<T: for<'de> Deserialize<'de>>(part: &str) -> Result<T, TokenError> {
    let bytes = Base64UrlUnpadded::decode_vec(part).map_err(|_| TokenError::Invalid)?;
    serde_json::from_slice(&bytes).map_err(|_| TokenError::Invalid)
}

/// Issues and verifies signed session tokens. Pure computation plus a clock.
pub struct TokenService {
    secret: SecretString,
}

impl TokenService {
    /// # Errors
    ///
    /// Fails fast with [`TokenError::WeakSecret`] if the secret is shorter
    /// than [`MIN_SECRET_LENGTH`] characters.
    pub fn new(secret: SecretString) -> Result<Self, TokenError> {
        if secret.expose_secret().chars().count() < MIN_SECRET_LENGTH {
            return Err(TokenError::WeakSecret);
        }
        Ok(Self { secret })
    }

    /// Issue an access/refresh pair for a verified principal.
    ///
    /// # Errors
    ///
    /// Returns an error if claims cannot be encoded.
    pub fn issue(&self, principal: &Principal) -> Result<TokenPair, TokenError> {
        let now = unix_now();
        Ok(TokenPair {
            access_token: self.sign(principal, now, ACCESS_TOKEN_TTL, false)?,
            refresh_token: self.sign(principal, now, REFRESH_TOKEN_TTL, true)?,
        })
    }

    /// Verify a token and return its principal.
    ///
    /// # Errors
    ///
    /// - [`TokenError::Expired`] when the signature is valid but `exp` has
    ///   passed.
    /// - [`TokenError::Invalid`] on any structural or signature failure, and
    ///   when `is_refresh_token` does not match `expect_refresh`.
    pub fn verify(&self, token: &str, expect_refresh: bool) -> Result<Principal, TokenError> {
        self.verify_at(token, expect_refresh, unix_now())
    }

    pub(crate) fn verify_at(
        &self,
        token: &str,
        expect_refresh: bool,
        now_unix_seconds: i64,
    ) -> Result<Principal, TokenError> {
        let mut parts = token.split('.');
        let header_b64 = parts.next().ok_or(TokenError::Invalid)?;
        let claims_b64 = parts.next().ok_or(TokenError::Invalid)?;
        let sig_b64 = parts.next().ok_or(TokenError::Invalid)?;
        if parts.next().is_some() {
            return Err(TokenError::Invalid);
        }

        let header: Header = b64d_json(header_b64)?;
        if header.alg != "HS256" {
            return Err(TokenError::Invalid);
        }

        // Constant-time signature check before any claim is trusted.
        let signature = Base64UrlUnpadded::decode_vec(sig_b64).map_err(|_| TokenError::Invalid)?;
        let mut mac = self.mac();
        mac.update(header_b64.as_bytes());
        mac.update(b".");
        mac.update(claims_b64.as_bytes());
        mac.verify_slice(&signature).map_err(|_| TokenError::Invalid)?;

        let claims: Claims = b64d_json(claims_b64)?;
        if claims.exp <= now_unix_seconds {
            return Err(TokenError::Expired);
        }
        if claims.is_refresh_token != expect_refresh {
            return Err(TokenError::Invalid);
        }

        Ok(claims.user)
    }

    fn sign(
        &self,
        principal: &Principal,
        now_unix_seconds: i64,
        ttl: Duration,
        is_refresh_token: bool,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            iat: now_unix_seconds,
            exp: now_unix_seconds.saturating_add(ttl.as_secs().try_into().unwrap_or(i64::MAX)),
            jti: Uuid::new_v4().to_string(),
            is_refresh_token,
            user: principal.clone(),
        };

        let signing_input = format!("{}.{}", b64e_json(&Header::hs256())?, b64e_json(&claims)?);
        let mut mac = self.mac();
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();

        Ok(format!(
            "{signing_input}.{}",
            Base64UrlUnpadded::encode_string(&signature)
        ))
    }

    fn mac(&self) -> HmacSha256 {
        // HMAC accepts keys of any length; the minimum is enforced in new().
        HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .expect("HMAC accepts any key length")
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(SecretString::from("0123456789abcdef0123456789abcdef"))
            .expect("secret long enough")
    }

    fn principal() -> Principal {
        Principal {
            id: Uuid::new_v4(),
            username: "dispatcher".to_string(),
            company_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn rejects_short_secret() {
        let result = TokenService::new(SecretString::from("too short"));
        assert!(matches!(result, Err(TokenError::WeakSecret)));
    }

    #[test]
    fn issue_then_verify_recovers_the_principal() -> Result<(), TokenError> {
        let service = service();
        let principal = principal();
        let pair = service.issue(&principal)?;

        assert_eq!(service.verify(&pair.access_token, false)?, principal);
        assert_eq!(service.verify(&pair.refresh_token, true)?, principal);
        Ok(())
    }

    #[test]
    fn token_type_mismatch_is_invalid() -> Result<(), TokenError> {
        let service = service();
        let pair = service.issue(&principal())?;

        assert!(matches!(
            service.verify(&pair.access_token, true),
            Err(TokenError::Invalid)
        ));
        assert!(matches!(
            service.verify(&pair.refresh_token, false),
            Err(TokenError::Invalid)
        ));
        Ok(())
    }

    #[test]
    fn expiry_is_detected_after_clock_advance() -> Result<(), TokenError> {
        let service = service();
        let pair = service.issue(&principal())?;

        let past_access_expiry = unix_now() + 25 * 60 * 60;
        assert!(matches!(
            service.verify_at(&pair.access_token, false, past_access_expiry),
            Err(TokenError::Expired)
        ));
        // The refresh token outlives the access token.
        assert!(
            service
                .verify_at(&pair.refresh_token, true, past_access_expiry)
                .is_ok()
        );

        let past_refresh_expiry = unix_now() + 49 * 60 * 60;
        assert!(matches!(
            service.verify_at(&pair.refresh_token, true, past_refresh_expiry),
            Err(TokenError::Expired)
        ));
        Ok(())
    }

    #[test]
    fn tampered_payload_is_invalid() -> Result<(), TokenError> {
        let service = service();
        let pair = service.issue(&principal())?;

        let mut parts: Vec<&str> = pair.access_token.split('.').collect();
        let forged_claims = b64e_json(&Claims {
            exp: unix_now() + 3600,
            iat: unix_now(),
            jti: "forged".to_string(),
            is_refresh_token: false,
            user: principal(),
        })?;
        parts[1] = &forged_claims;
        let forged = parts.join(".");

        assert!(matches!(
            service.verify(&forged, false),
            Err(TokenError::Invalid)
        ));
        Ok(())
    }

    #[test]
    fn token_signed_with_another_secret_is_invalid() -> Result<(), TokenError> {
        let other = TokenService::new(SecretString::from("ffffffffffffffffffffffffffffffff"))?;
        let pair = other.issue(&principal())?;
        assert!(matches!(
            service().verify(&pair.access_token, false),
            Err(TokenError::Invalid)
        ));
        Ok(())
    }

    #[test]
    fn garbage_is_invalid_not_expired() {
        let service = service();
        for token in ["", "a.b", "a.b.c.d", "not-a-token", "a.b.c"] {
            assert!(
                matches!(service.verify(token, false), Err(TokenError::Invalid)),
                "expected Invalid for {token:?}"
            );
        }
    }
}
