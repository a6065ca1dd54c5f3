//! Durable store contracts for users, roles, and permissions.
//!
//! The store is the source of truth the cache memoizes. Absence is expressed
//! as `Ok(None)`/`Ok(false)` at this boundary; an `Err` always means the
//! backend itself failed, so callers can keep not-found and internal failures
//! apart.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

pub mod postgres;

pub use postgres::{PgPermissionStore, PgUserStore};

/// A grant tying a route+method (optionally a dynamic-parameter constraint)
/// to allowed access, or a global grant when `allow_all` is set. Immutable
/// reference data owned by the store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Permission {
    pub id: Uuid,
    pub alias: String,
    pub name: String,
    pub path: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_param: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_param_value: Option<String>,
    pub allow_all: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub company_id: Uuid,
    pub role_id: Uuid,
    pub password_hash: String,
}

/// Top-level entry of the permission catalog tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ModuleRecord {
    pub id: Uuid,
    pub name: String,
    pub alias: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PermissionGroupRecord {
    pub id: Uuid,
    pub module_id: Uuid,
    pub name: String,
    pub alias: String,
}

/// Catalog view of a permission: identity only, no route details.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CatalogPermissionRecord {
    pub id: Uuid,
    pub group_id: Uuid,
    pub name: String,
    pub alias: String,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_by_username(&self, username: &str) -> Result<Option<UserRecord>>;
    async fn get_by_id(&self, id: Uuid) -> Result<Option<UserRecord>>;
    /// Replace the stored password hash. Returns `false` when no such user
    /// exists.
    async fn update_password(&self, id: Uuid, new_hash: &str) -> Result<bool>;
}

#[async_trait]
pub trait PermissionStore: Send + Sync {
    /// Find a rule granting `user_id` access to `path`+`method`, either
    /// route-scoped through the user's role or via `allow_all`.
    async fn find_permission(
        &self,
        user_id: Uuid,
        path: &str,
        method: &str,
    ) -> Result<Option<Permission>>;

    async fn permissions_for_role(&self, role_id: Uuid) -> Result<Vec<Permission>>;

    async fn permissions_for_user(&self, user_id: Uuid) -> Result<Vec<Permission>>;

    /// Whether the user holds the designated admin role.
    async fn is_admin(&self, user_id: Uuid) -> Result<bool>;

    // Bulk readers used only by the catalog listing.
    async fn list_modules(&self) -> Result<Vec<ModuleRecord>>;
    async fn list_permission_groups(&self) -> Result<Vec<PermissionGroupRecord>>;
    async fn list_permissions(&self) -> Result<Vec<CatalogPermissionRecord>>;
}
