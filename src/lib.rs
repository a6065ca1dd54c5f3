//! # Ruxsat (Authentication, Authorization & Credential Reset)
//!
//! `ruxsat` is the authentication and authorization engine for the admin
//! backend. It verifies username/password credentials, issues HS256 session
//! tokens, and answers per-request allow/deny decisions against a
//! role-permission model stored in Postgres.
//!
//! ## Sessions
//!
//! Each login issues an access/refresh token pair. Tokens carry only the
//! user's identity, never roles or permissions, so permission edits take
//! effect without re-issuing tokens. Expiry is the only termination
//! mechanism; there is no server-side revocation.
//!
//! ## Authorization
//!
//! Every protected request is checked against the caller's role: a rule may
//! match a route and method exactly, pin a dynamic parameter to a specific
//! value, or grant everything via `allow_all`. Members of the designated
//! admin role pass even without a matching rule. Decisions are memoized in a
//! TTL cache (Redis or in-process) and the dynamic parameter is re-validated
//! on every hit.
//!
//! ## Password Reset
//!
//! A three-stage, email-driven flow: request a 4-digit code, verify it,
//! then set the new password. The intermediate state lives only in the cache
//! and expires after ten minutes.

pub mod api;
pub mod auth;
pub mod authz;
pub mod cache;
pub mod cli;
pub mod error;
pub mod security;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        // Should be a hex string (full SHA-1 is 40 chars, but could be short)
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
