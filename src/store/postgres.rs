//! Postgres implementations of the store contracts.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::Instrument;
use uuid::Uuid;

use super::{
    CatalogPermissionRecord, ModuleRecord, Permission, PermissionGroupRecord, PermissionStore,
    UserRecord, UserStore,
};

fn query_span(operation: &str, statement: &str) -> tracing::Span {
    tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

fn user_from_row(row: &PgRow) -> UserRecord {
    UserRecord {
        id: row.get("id"),
        username: row.get("username"),
        company_id: row.get("company_id"),
        role_id: row.get("role_id"),
        password_hash: row.get("password_hash"),
    }
}

fn permission_from_row(row: &PgRow) -> Permission {
    Permission {
        id: row.get("id"),
        alias: row.get("alias"),
        name: row.get("name"),
        path: row.get("path"),
        method: row.get("method"),
        query_param: row.get("query_param"),
        query_param_value: row.get("query_param_value"),
        allow_all: row.get("allow_all"),
    }
}

pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn get_by_username(&self, username: &str) -> Result<Option<UserRecord>> {
        let query = r"
            SELECT id, username, company_id, role_id, password_hash
            FROM users
            WHERE username = $1 AND deleted_at IS NULL
        ";
        let row = sqlx::query(query)
            .bind(username)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to fetch user")?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<UserRecord>> {
        let query = r"
            SELECT id, username, company_id, role_id, password_hash
            FROM users
            WHERE id = $1 AND deleted_at IS NULL
        ";
        let row = sqlx::query(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to fetch user")?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn update_password(&self, id: Uuid, new_hash: &str) -> Result<bool> {
        let query = r"
            UPDATE users
            SET password_hash = $2, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
        ";
        let result = sqlx::query(query)
            .bind(id)
            .bind(new_hash)
            .execute(&self.pool)
            .instrument(query_span("UPDATE", query))
            .await
            .context("failed to update password")?;

        Ok(result.rows_affected() > 0)
    }
}

pub struct PgPermissionStore {
    pool: PgPool,
    admin_role_id: Uuid,
}

impl PgPermissionStore {
    #[must_use]
    pub fn new(pool: PgPool, admin_role_id: Uuid) -> Self {
        Self {
            pool,
            admin_role_id,
        }
    }
}

#[async_trait]
impl PermissionStore for PgPermissionStore {
    async fn find_permission(
        &self,
        user_id: Uuid,
        path: &str,
        method: &str,
    ) -> Result<Option<Permission>> {
        let query = r"
            SELECT p.id, p.alias, p.name, p.path, p.method,
                   p.query_param, p.query_param_value, p.allow_all
            FROM permissions p
            JOIN role_permissions rp ON rp.permission_id = p.id
            JOIN users u ON u.role_id = rp.role_id
            WHERE u.id = $1
              AND u.deleted_at IS NULL
              AND p.deleted_at IS NULL
              AND ((p.path = $2 AND p.method = $3) OR p.allow_all)
            LIMIT 1
        ";
        let row = sqlx::query(query)
            .bind(user_id)
            .bind(path)
            .bind(method)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to find permission")?;

        Ok(row.as_ref().map(permission_from_row))
    }

    async fn permissions_for_role(&self, role_id: Uuid) -> Result<Vec<Permission>> {
        let query = r"
            SELECT p.id, p.alias, p.name, p.path, p.method,
                   p.query_param, p.query_param_value, p.allow_all
            FROM permissions p
            JOIN role_permissions rp ON rp.permission_id = p.id
            WHERE rp.role_id = $1 AND p.deleted_at IS NULL
        ";
        let rows = sqlx::query(query)
            .bind(role_id)
            .fetch_all(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to list role permissions")?;

        Ok(rows.iter().map(permission_from_row).collect())
    }

    async fn permissions_for_user(&self, user_id: Uuid) -> Result<Vec<Permission>> {
        let query = r"
            SELECT p.id, p.alias, p.name, p.path, p.method,
                   p.query_param, p.query_param_value, p.allow_all
            FROM permissions p
            JOIN role_permissions rp ON rp.permission_id = p.id
            JOIN users u ON u.role_id = rp.role_id
            WHERE u.id = $1 AND u.deleted_at IS NULL AND p.deleted_at IS NULL
        ";
        let rows = sqlx::query(query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to list user permissions")?;

        Ok(rows.iter().map(permission_from_row).collect())
    }

    async fn is_admin(&self, user_id: Uuid) -> Result<bool> {
        let query = r"
            SELECT EXISTS(
                SELECT 1 FROM users
                WHERE id = $1 AND role_id = $2 AND deleted_at IS NULL
            ) AS is_admin
        ";
        let row = sqlx::query(query)
            .bind(user_id)
            .bind(self.admin_role_id)
            .fetch_one(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to check admin role")?;

        Ok(row.get("is_admin"))
    }

    async fn list_modules(&self) -> Result<Vec<ModuleRecord>> {
        let query = r"
            SELECT id, name, alias
            FROM permission_modules
            WHERE deleted_at IS NULL
        ";
        let rows = sqlx::query(query)
            .fetch_all(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to list permission modules")?;

        Ok(rows
            .into_iter()
            .map(|row| ModuleRecord {
                id: row.get("id"),
                name: row.get("name"),
                alias: row.get("alias"),
            })
            .collect())
    }

    async fn list_permission_groups(&self) -> Result<Vec<PermissionGroupRecord>> {
        let query = r"
            SELECT id, module_id, name, alias
            FROM permission_groups
            WHERE deleted_at IS NULL
        ";
        let rows = sqlx::query(query)
            .fetch_all(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to list permission groups")?;

        Ok(rows
            .into_iter()
            .map(|row| PermissionGroupRecord {
                id: row.get("id"),
                module_id: row.get("module_id"),
                name: row.get("name"),
                alias: row.get("alias"),
            })
            .collect())
    }

    async fn list_permissions(&self) -> Result<Vec<CatalogPermissionRecord>> {
        let query = r"
            SELECT id, group_id, name, alias
            FROM permissions
            WHERE deleted_at IS NULL
        ";
        let rows = sqlx::query(query)
            .fetch_all(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to list permissions")?;

        Ok(rows
            .into_iter()
            .map(|row| CatalogPermissionRecord {
                id: row.get("id"),
                group_id: row.get("group_id"),
                name: row.get("name"),
                alias: row.get("alias"),
            })
            .collect())
    }
}
