//! In-memory store and mailer fakes shared by the integration tests.

// Not every test binary uses every fake.
#![allow(dead_code)]

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use uuid::Uuid;

use ruxsat::auth::{Mail, Mailer};
use ruxsat::store::{
    CatalogPermissionRecord, ModuleRecord, Permission, PermissionGroupRecord, PermissionStore,
    UserRecord, UserStore,
};

#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<Vec<UserRecord>>,
}

impl MemoryUserStore {
    pub fn with_users(users: Vec<UserRecord>) -> Self {
        Self {
            users: Mutex::new(users),
        }
    }

    pub fn password_hash_of(&self, id: Uuid) -> Option<String> {
        self.users
            .lock()
            .expect("user store poisoned")
            .iter()
            .find(|user| user.id == id)
            .map(|user| user.password_hash.clone())
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn get_by_username(&self, username: &str) -> Result<Option<UserRecord>> {
        Ok(self
            .users
            .lock()
            .expect("user store poisoned")
            .iter()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<UserRecord>> {
        Ok(self
            .users
            .lock()
            .expect("user store poisoned")
            .iter()
            .find(|user| user.id == id)
            .cloned())
    }

    async fn update_password(&self, id: Uuid, new_hash: &str) -> Result<bool> {
        let mut users = self.users.lock().expect("user store poisoned");
        match users.iter_mut().find(|user| user.id == id) {
            Some(user) => {
                user.password_hash = new_hash.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Permission rules keyed directly by user id, plus an admin set. Counts
/// lookups so tests can assert when the cache absorbed a request.
#[derive(Default)]
pub struct MemoryPermissionStore {
    pub rules: Mutex<Vec<(Uuid, Permission)>>,
    pub admins: Mutex<Vec<Uuid>>,
    pub modules: Vec<ModuleRecord>,
    pub groups: Vec<PermissionGroupRecord>,
    pub permissions: Vec<CatalogPermissionRecord>,
    pub find_calls: AtomicUsize,
    pub fail_find: AtomicBool,
}

impl MemoryPermissionStore {
    pub fn grant(&self, user_id: Uuid, permission: Permission) {
        self.rules
            .lock()
            .expect("permission store poisoned")
            .push((user_id, permission));
    }

    pub fn make_admin(&self, user_id: Uuid) {
        self.admins
            .lock()
            .expect("permission store poisoned")
            .push(user_id);
    }

    pub fn find_call_count(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PermissionStore for MemoryPermissionStore {
    async fn find_permission(
        &self,
        user_id: Uuid,
        path: &str,
        method: &str,
    ) -> Result<Option<Permission>> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_find.load(Ordering::SeqCst) {
            return Err(anyhow!("permission backend unavailable"));
        }
        Ok(self
            .rules
            .lock()
            .expect("permission store poisoned")
            .iter()
            .find(|(owner, rule)| {
                *owner == user_id
                    && (rule.allow_all || (rule.path == path && rule.method == method))
            })
            .map(|(_, rule)| rule.clone()))
    }

    async fn permissions_for_role(&self, _role_id: Uuid) -> Result<Vec<Permission>> {
        Ok(Vec::new())
    }

    async fn permissions_for_user(&self, user_id: Uuid) -> Result<Vec<Permission>> {
        Ok(self
            .rules
            .lock()
            .expect("permission store poisoned")
            .iter()
            .filter(|(owner, _)| *owner == user_id)
            .map(|(_, rule)| rule.clone())
            .collect())
    }

    async fn is_admin(&self, user_id: Uuid) -> Result<bool> {
        Ok(self
            .admins
            .lock()
            .expect("permission store poisoned")
            .contains(&user_id))
    }

    async fn list_modules(&self) -> Result<Vec<ModuleRecord>> {
        Ok(self.modules.clone())
    }

    async fn list_permission_groups(&self) -> Result<Vec<PermissionGroupRecord>> {
        Ok(self.groups.clone())
    }

    async fn list_permissions(&self) -> Result<Vec<CatalogPermissionRecord>> {
        Ok(self.permissions.clone())
    }
}

/// Records instead of delivering.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<Mail>>,
}

impl RecordingMailer {
    pub fn last(&self) -> Option<Mail> {
        self.sent
            .lock()
            .expect("mailer poisoned")
            .last()
            .cloned()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().expect("mailer poisoned").len()
    }
}

impl Mailer for RecordingMailer {
    fn send(&self, mail: &Mail) -> Result<()> {
        self.sent.lock().expect("mailer poisoned").push(mail.clone());
        Ok(())
    }
}

pub fn user(username: &str, password_hash: &str) -> UserRecord {
    UserRecord {
        id: Uuid::new_v4(),
        username: username.to_string(),
        company_id: Uuid::new_v4(),
        role_id: Uuid::new_v4(),
        password_hash: password_hash.to_string(),
    }
}

pub fn rule(path: &str, method: &str) -> Permission {
    Permission {
        id: Uuid::new_v4(),
        alias: format!("{method}-{path}"),
        name: format!("{method} {path}"),
        path: path.to_string(),
        method: method.to_string(),
        query_param: None,
        query_param_value: None,
        allow_all: false,
    }
}
