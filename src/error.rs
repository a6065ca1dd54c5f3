//! Closed error taxonomy shared by the auth engine.
//!
//! Callers match on the variant, never on message content. Anything that is
//! not part of the taxonomy is wrapped in [`Error::Internal`] and reported via
//! `tracing::error!` before it reaches the HTTP boundary; its message never
//! crosses that boundary.

use thiserror::Error;

use crate::security::token::TokenError;

#[derive(Debug, Error)]
pub enum Error {
    /// Missing or absent credential.
    #[error("unauthorized")]
    Unauthorized,
    /// Malformed, mis-typed, or badly signed token.
    #[error("invalid token")]
    InvalidToken,
    /// Valid signature, past expiry.
    #[error("expired token")]
    ExpiredToken,
    /// Authenticated but not permitted.
    #[error("permission denied")]
    Forbidden,
    /// Bad user-supplied input, attributed to a single field.
    #[error("{field}: {message}")]
    Validation { field: String, message: String },
    /// Entity absent. Translated at the repository boundary, never conflated
    /// with `Internal`.
    #[error("not found")]
    NotFound,
    /// Store/cache/mail/KDF failure. The source is kept for operator logs.
    #[error("internal error")]
    Internal(#[source] anyhow::Error),
}

impl Error {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub(crate) fn internal(err: impl Into<anyhow::Error>) -> Self {
        Self::Internal(err.into())
    }
}

impl From<TokenError> for Error {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => Self::ExpiredToken,
            _ => Self::InvalidToken,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_renders_field_and_message() {
        let err = Error::validation("reset_code", "reset code is not valid");
        assert_eq!(err.to_string(), "reset_code: reset code is not valid");
    }

    #[test]
    fn token_errors_map_to_taxonomy() {
        assert!(matches!(
            Error::from(TokenError::Expired),
            Error::ExpiredToken
        ));
        assert!(matches!(
            Error::from(TokenError::Invalid),
            Error::InvalidToken
        ));
    }

    #[test]
    fn internal_hides_the_source_message() {
        let err = Error::internal(anyhow::anyhow!("connection refused"));
        assert_eq!(err.to_string(), "internal error");
    }
}
