//! Request authorization: bearer-token authentication plus per-route
//! permission checks memoized in the cache.
//!
//! Decisions are derived from the store, cached for a short window, and
//! re-validated against the request's dynamic parameter on every hit. The
//! cache only ever shortens the store round trip; it never widens access
//! beyond what the stored rule grants.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};
use uuid::Uuid;

use crate::cache::{ObjectCache, cache_key, get_object, set_object};
use crate::error::Error;
use crate::security::token::{Principal, TokenService};
use crate::store::{Permission, PermissionStore};

pub mod catalog;

pub use catalog::{CatalogGroup, CatalogModule, PermissionCatalog};

/// How long a route-scoped rule stays memoized.
const RULE_TTL: Duration = Duration::from_secs(30);
/// Admin bypass changes rarely, so it is held much longer.
const ADMIN_BYPASS_TTL: Duration = Duration::from_secs(60 * 60);

/// Extracts a dynamic request value by parameter name. Implemented over path
/// parameters and the query string at the HTTP boundary, and over plain maps
/// in tests.
pub type ParamLookup<'a> = &'a (dyn Fn(&str) -> Option<String> + Send + Sync);

/// A memoized authorization outcome. Tagged so an admin bypass can never be
/// confused with (or downgraded to) a rule entry.
#[derive(Debug, Serialize, Deserialize)]
enum CachedDecision {
    AdminBypass,
    Rule(Permission),
}

/// Authenticates bearer tokens and answers allow/deny for route access.
pub struct Authorizer {
    permissions: Arc<dyn PermissionStore>,
    cache: Arc<dyn ObjectCache>,
    tokens: Arc<TokenService>,
}

impl Authorizer {
    #[must_use]
    pub fn new(
        permissions: Arc<dyn PermissionStore>,
        cache: Arc<dyn ObjectCache>,
        tokens: Arc<TokenService>,
    ) -> Self {
        Self {
            permissions,
            cache,
            tokens,
        }
    }

    /// Validate an `Authorization` header and return the verified principal.
    ///
    /// # Errors
    ///
    /// - [`Error::Unauthorized`] when the header is absent or not of the form
    ///   `Bearer <token>`.
    /// - [`Error::InvalidToken`] / [`Error::ExpiredToken`] from verification.
    pub fn check_auth(&self, header: Option<&str>) -> Result<Principal, Error> {
        let header = header.map(str::trim).filter(|h| !h.is_empty());
        let Some(header) = header else {
            return Err(Error::Unauthorized);
        };

        let mut parts = header.split_whitespace();
        let (Some(scheme), Some(token), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(Error::Unauthorized);
        };
        if !scheme.eq_ignore_ascii_case("bearer") {
            return Err(Error::Unauthorized);
        }

        Ok(self.tokens.verify(token, false)?)
    }

    /// Decide whether `user_id` may call `method path`, consulting the cache
    /// first and the store on a miss.
    ///
    /// `params` resolves the rule's dynamic parameter (path segment or query
    /// value); it is consulted on every decision, cached or fresh, so a hit
    /// for one resource never authorizes a sibling.
    ///
    /// # Errors
    ///
    /// [`Error::Forbidden`] when no rule grants access; [`Error::Internal`]
    /// when the cache or store fails mid-decision.
    pub async fn has_access(
        &self,
        user_id: Uuid,
        path: &str,
        method: &str,
        params: ParamLookup<'_>,
    ) -> Result<(), Error> {
        let key = cache_key("permission", &[path, method, &user_id.to_string()]);

        let cached: Option<CachedDecision> = get_object(&*self.cache, &key).await.map_err(|err| {
            error!("Failed to read authorization cache: {err}");
            Error::internal(err)
        })?;

        if let Some(decision) = cached {
            return match decision {
                CachedDecision::AdminBypass => Ok(()),
                CachedDecision::Rule(permission) if matches_param(&permission, params) => Ok(()),
                CachedDecision::Rule(_) => Err(Error::Forbidden),
            };
        }

        let rule = self
            .permissions
            .find_permission(user_id, path, method)
            .await
            .map_err(|err| {
                error!("Failed to look up permission: {err}");
                Error::internal(err)
            })?;

        if let Some(permission) = rule {
            // Only allowed decisions are memoized; a parameter mismatch is
            // denied without a cache write.
            if !matches_param(&permission, params) {
                return Err(Error::Forbidden);
            }
            self.remember(&key, &CachedDecision::Rule(permission), RULE_TTL)
                .await;
            return Ok(());
        }

        // No rule covers the route; an admin role still passes.
        let is_admin = self.permissions.is_admin(user_id).await.map_err(|err| {
            error!("Failed to check admin role: {err}");
            Error::internal(err)
        })?;
        if is_admin {
            self.remember(&key, &CachedDecision::AdminBypass, ADMIN_BYPASS_TTL)
                .await;
            return Ok(());
        }

        Err(Error::Forbidden)
    }

    /// Best-effort cache write. The decision is already made from the store,
    /// so a failed write only costs the next request a round trip.
    async fn remember(&self, key: &str, decision: &CachedDecision, ttl: Duration) {
        if let Err(err) = set_object(&*self.cache, key, decision, ttl).await {
            warn!("Failed to cache authorization decision: {err}");
        }
    }
}

/// A rule without a dynamic-parameter constraint matches unconditionally;
/// otherwise the request's value for the named parameter must equal the
/// rule's expected value. A missing request value compares as empty.
fn matches_param(permission: &Permission, params: ParamLookup<'_>) -> bool {
    let Some(name) = permission.query_param.as_deref().filter(|n| !n.is_empty()) else {
        return true;
    };
    let expected = permission.query_param_value.as_deref().unwrap_or_default();
    params(name).unwrap_or_default() == expected
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(query_param: Option<&str>, query_param_value: Option<&str>) -> Permission {
        Permission {
            id: Uuid::new_v4(),
            alias: "drivers-read".to_string(),
            name: "Read drivers".to_string(),
            path: "/v1/drivers".to_string(),
            method: "GET".to_string(),
            query_param: query_param.map(str::to_string),
            query_param_value: query_param_value.map(str::to_string),
            allow_all: false,
        }
    }

    #[test]
    fn unconstrained_rule_matches_any_request() {
        let none = |_: &str| None;
        assert!(matches_param(&rule(None, None), &none));
        assert!(matches_param(&rule(Some(""), Some("x")), &none));
    }

    #[test]
    fn constrained_rule_compares_the_extracted_value() {
        let permission = rule(Some("driver_id"), Some("D1"));

        let hit = |name: &str| (name == "driver_id").then(|| "D1".to_string());
        assert!(matches_param(&permission, &hit));

        let miss = |name: &str| (name == "driver_id").then(|| "D2".to_string());
        assert!(!matches_param(&permission, &miss));

        let absent = |_: &str| None;
        assert!(!matches_param(&permission, &absent));
    }

    #[test]
    fn missing_value_matches_an_empty_expectation() {
        let permission = rule(Some("driver_id"), None);
        let absent = |_: &str| None;
        assert!(matches_param(&permission, &absent));
    }
}
