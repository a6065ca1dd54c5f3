//! The permission catalog: modules, their groups, and each group's
//! permissions, assembled for management UIs.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use super::Authorizer;
use crate::cache::{cache_key, get_object, set_object};
use crate::error::Error;
use crate::store::{CatalogPermissionRecord, ModuleRecord, PermissionGroupRecord};

/// Reference data that changes only on deploys, so it is held for a week.
const CATALOG_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PermissionCatalog {
    pub count: usize,
    pub modules: Vec<CatalogModule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CatalogModule {
    pub id: Uuid,
    pub name: String,
    pub alias: String,
    pub groups: Vec<CatalogGroup>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CatalogGroup {
    pub id: Uuid,
    pub name: String,
    pub alias: String,
    pub permissions: Vec<CatalogPermissionRecord>,
}

impl Authorizer {
    /// Assemble the full permission catalog, cached as one object.
    ///
    /// The three table reads run concurrently and are merged only after all
    /// of them settle; a failed read degrades to an empty branch of the tree
    /// rather than failing the whole listing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Internal`] only when the assembled catalog cannot be
    /// written back; read failures are logged and tolerated.
    pub async fn modules(&self) -> Result<PermissionCatalog, Error> {
        let key = cache_key("permission-modules", &[]);

        // A cache-read failure here is not security relevant, so it degrades
        // to a miss instead of failing the request.
        match get_object::<PermissionCatalog>(&*self.cache, &key).await {
            Ok(Some(catalog)) => return Ok(catalog),
            Ok(None) => {}
            Err(err) => warn!("Failed to read catalog cache: {err}"),
        }

        let (modules, groups, permissions) = tokio::join!(
            self.permissions.list_modules(),
            self.permissions.list_permission_groups(),
            self.permissions.list_permissions(),
        );

        let modules = modules.unwrap_or_else(|err| {
            error!("Failed to list permission modules: {err}");
            Vec::new()
        });
        let groups = groups.unwrap_or_else(|err| {
            error!("Failed to list permission groups: {err}");
            Vec::new()
        });
        let permissions = permissions.unwrap_or_else(|err| {
            error!("Failed to list permissions: {err}");
            Vec::new()
        });

        let catalog = assemble(modules, groups, permissions);

        if let Err(err) = set_object(&*self.cache, &key, &catalog, CATALOG_TTL).await {
            warn!("Failed to cache permission catalog: {err}");
        }

        Ok(catalog)
    }
}

/// Merge the three flat listings into a module → group → permission tree.
/// Orphaned groups or permissions (dangling foreign keys) are dropped.
fn assemble(
    modules: Vec<ModuleRecord>,
    groups: Vec<PermissionGroupRecord>,
    permissions: Vec<CatalogPermissionRecord>,
) -> PermissionCatalog {
    let modules: Vec<CatalogModule> = modules
        .into_iter()
        .map(|module| {
            let groups = groups
                .iter()
                .filter(|group| group.module_id == module.id)
                .map(|group| CatalogGroup {
                    id: group.id,
                    name: group.name.clone(),
                    alias: group.alias.clone(),
                    permissions: permissions
                        .iter()
                        .filter(|permission| permission.group_id == group.id)
                        .cloned()
                        .collect(),
                })
                .collect();
            CatalogModule {
                id: module.id,
                name: module.name,
                alias: module.alias,
                groups,
            }
        })
        .collect();

    PermissionCatalog {
        count: modules.len(),
        modules,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assemble_nests_groups_and_permissions_by_foreign_key() {
        let billing = ModuleRecord {
            id: Uuid::new_v4(),
            name: "Billing".to_string(),
            alias: "billing".to_string(),
        };
        let fleet = ModuleRecord {
            id: Uuid::new_v4(),
            name: "Fleet".to_string(),
            alias: "fleet".to_string(),
        };
        let invoices = PermissionGroupRecord {
            id: Uuid::new_v4(),
            module_id: billing.id,
            name: "Invoices".to_string(),
            alias: "invoices".to_string(),
        };
        let read = CatalogPermissionRecord {
            id: Uuid::new_v4(),
            group_id: invoices.id,
            name: "Read invoices".to_string(),
            alias: "invoices-read".to_string(),
        };
        let orphan = CatalogPermissionRecord {
            id: Uuid::new_v4(),
            group_id: Uuid::new_v4(),
            name: "Orphan".to_string(),
            alias: "orphan".to_string(),
        };

        let catalog = assemble(
            vec![billing.clone(), fleet.clone()],
            vec![invoices.clone()],
            vec![read.clone(), orphan],
        );

        assert_eq!(catalog.count, 2);
        assert_eq!(catalog.modules[0].id, billing.id);
        assert_eq!(catalog.modules[0].groups.len(), 1);
        assert_eq!(catalog.modules[0].groups[0].permissions, vec![read]);
        assert_eq!(catalog.modules[1].id, fleet.id);
        assert!(catalog.modules[1].groups.is_empty());
    }

    #[test]
    fn assemble_tolerates_empty_listings() {
        let catalog = assemble(Vec::new(), Vec::new(), Vec::new());
        assert_eq!(catalog.count, 0);
        assert!(catalog.modules.is_empty());
    }
}
