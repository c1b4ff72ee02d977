//! In-memory implementation of the store traits.
//!
//! Mirrors the Postgres constraints the authorization core relies on (unique
//! keys, set-replace joins, role links cleared and stamped when the role is
//! deleted, shadow rows keyed by source) and adds knobs for injecting latency
//! and outages.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use lectern_core::PermissionKey;
use lectern_models::{
    AdminId, AdminPrincipal, DepartmentId, Faculty, FacultyId, FacultyPrincipal, Institute,
    InstituteId, InstitutePrincipal, Permission, PermissionId, Principal, PrincipalKind, Role,
    RoleId, RoleWithPermissions, UserId, UserPrincipal, UserType,
};

use crate::error::StoreError;
use crate::store::{
    AccountStore, AdminCredentials, CredentialStore, DirectoryStore, FacultyCredentials, IdentityStore,
    InstituteCredentials, NewAdmin, NewFaculty, NewInstitute, NewPermission, NewRole, NewUser,
    RoleChanges, RoleStore, ShadowUser, UserCredentials,
};

#[derive(Debug, Clone)]
struct UserRecord {
    principal: UserPrincipal,
    mobile: Option<String>,
    password_hash: Option<String>,
    source: Option<(UserType, Uuid)>,
}

#[derive(Debug, Default)]
struct State {
    admins: HashMap<AdminId, AdminCredentials>,
    users: HashMap<UserId, UserRecord>,
    institutes: HashMap<InstituteId, InstituteCredentials>,
    faculties: HashMap<FacultyId, FacultyCredentials>,
    departments: HashMap<DepartmentId, InstituteId>,
    roles: HashMap<RoleId, Role>,
    permissions: HashMap<PermissionId, Permission>,
    role_permissions: HashMap<RoleId, BTreeSet<PermissionId>>,
    user_roles: HashMap<UserId, BTreeSet<RoleId>>,
}

impl State {
    fn role_with_permissions(&self, id: RoleId) -> Option<RoleWithPermissions> {
        let role = self.roles.get(&id)?.clone();
        let mut permissions: Vec<Permission> = self
            .role_permissions
            .get(&id)
            .into_iter()
            .flatten()
            .filter_map(|pid| self.permissions.get(pid).cloned())
            .collect();
        permissions.sort_by(|a, b| a.permission_key.cmp(&b.permission_key));
        Some(RoleWithPermissions { role, permissions })
    }

    fn keys_of_role(&self, id: RoleId) -> Vec<String> {
        self.role_permissions
            .get(&id)
            .into_iter()
            .flatten()
            .filter_map(|pid| self.permissions.get(pid))
            .map(|p| p.permission_key.clone())
            .collect()
    }

    fn ensure_permissions(&self, ids: &[PermissionId]) -> Result<(), StoreError> {
        if ids.iter().all(|id| self.permissions.contains_key(id)) {
            Ok(())
        } else {
            Err(StoreError::InvalidReference("permission id".to_string()))
        }
    }

    fn ensure_roles(&self, ids: &[RoleId]) -> Result<(), StoreError> {
        if ids.iter().all(|id| self.roles.contains_key(id)) {
            Ok(())
        } else {
            Err(StoreError::InvalidReference("role id".to_string()))
        }
    }

    fn email_taken<'a, I>(mut emails: I, email: &str) -> bool
    where
        I: Iterator<Item = &'a str>,
    {
        emails.any(|existing| existing.eq_ignore_ascii_case(email))
    }
}

fn matches_search(search: Option<&str>, fields: &[&str]) -> bool {
    match search {
        None => true,
        Some(term) => {
            let term = term.to_lowercase();
            fields.iter().any(|f| f.to_lowercase().contains(&term))
        }
    }
}

fn page<T>(items: Vec<T>, limit: i64, offset: i64) -> (Vec<T>, i64) {
    let total = items.len() as i64;
    let page = items
        .into_iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect();
    (page, total)
}

/// Store holding everything in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
    latency: RwLock<Option<Duration>>,
    unavailable: AtomicBool,
    calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store with one permission row per catalog key.
    pub async fn with_catalog() -> Self {
        let store = Self::new();
        let entries: Vec<NewPermission> = PermissionKey::ALL
            .iter()
            .map(|key| NewPermission {
                permission_key: key.as_str().to_string(),
                permission_name: key.display_name().to_string(),
            })
            .collect();
        {
            let mut state = store.state.write().await;
            for entry in entries {
                let id = PermissionId::new();
                state.permissions.insert(
                    id,
                    Permission {
                        id,
                        permission_name: entry.permission_name,
                        permission_key: entry.permission_key,
                        created_at: Utc::now(),
                    },
                );
            }
        }
        store
    }

    /// Every store call sleeps this long first.
    pub async fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.write().await = latency;
    }

    /// Every store call fails with [`StoreError::Unavailable`] while set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of trait calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn enter(&self) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let latency = *self.latency.read().await;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store offline".to_string()));
        }
        Ok(())
    }

    pub async fn permission_id(&self, key: &str) -> Option<PermissionId> {
        self.state
            .read()
            .await
            .permissions
            .values()
            .find(|p| p.permission_key == key)
            .map(|p| p.id)
    }

    /// Adds a raw permission row, including keys outside the catalog.
    pub async fn insert_permission(&self, key: &str) -> PermissionId {
        let id = PermissionId::new();
        self.state.write().await.permissions.insert(
            id,
            Permission {
                id,
                permission_name: key.to_string(),
                permission_key: key.to_string(),
                created_at: Utc::now(),
            },
        );
        id
    }


    pub async fn set_admin_active(&self, id: AdminId, is_active: bool) {
        if let Some(admin) = self.state.write().await.admins.get_mut(&id) {
            admin.principal.is_active = is_active;
        }
    }

    pub async fn set_institute_mobile(&self, id: InstituteId, mobile: Option<String>) {
        if let Some(record) = self.state.write().await.institutes.get_mut(&id) {
            record.institute.mobile = mobile;
            record.institute.updated_at = Utc::now();
        }
    }

    pub async fn set_institute_active(&self, id: InstituteId, is_active: bool) {
        if let Some(record) = self.state.write().await.institutes.get_mut(&id) {
            record.institute.is_active = is_active;
        }
    }

    pub async fn remove_user(&self, id: UserId) {
        let mut state = self.state.write().await;
        state.users.remove(&id);
        state.user_roles.remove(&id);
    }

    pub async fn remove_institute(&self, id: InstituteId) {
        self.state.write().await.institutes.remove(&id);
    }

    /// Shadow rows projected from `source_id`.
    pub async fn shadow_users_of(&self, source_id: Uuid) -> Vec<(UserId, ShadowUser)> {
        self.state
            .read()
            .await
            .users
            .iter()
            .filter_map(|(id, record)| match record.source {
                Some((kind, sid)) if sid == source_id => Some((
                    *id,
                    ShadowUser {
                        source_kind: kind,
                        source_id: sid,
                        name: record.principal.name.clone(),
                        email: record.principal.email.clone(),
                        mobile: record.mobile.clone(),
                        is_active: record.principal.is_active,
                    },
                )),
                _ => None,
            })
            .collect()
    }

    pub async fn user_count(&self) -> usize {
        self.state.read().await.users.len()
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn create_admin(&self, new: NewAdmin) -> Result<AdminPrincipal, StoreError> {
        self.enter().await?;
        let mut state = self.state.write().await;
        if State::email_taken(
            state.admins.values().map(|a| a.principal.email.as_str()),
            &new.email,
        ) {
            return Err(StoreError::Conflict("admin email".to_string()));
        }

        let principal = AdminPrincipal {
            id: AdminId::new(),
            name: new.name,
            email: new.email,
            user_type: new.user_type,
            is_active: true,
        };
        state.admins.insert(
            principal.id,
            AdminCredentials {
                principal: principal.clone(),
                password_hash: new.password_hash,
            },
        );
        Ok(principal)
    }

    async fn create_user(&self, new: NewUser) -> Result<UserPrincipal, StoreError> {
        self.enter().await?;
        let mut state = self.state.write().await;
        let standalone = state
            .users
            .values()
            .filter(|u| u.source.is_none())
            .map(|u| u.principal.email.as_str());
        if State::email_taken(standalone, &new.email) {
            return Err(StoreError::Conflict("user email".to_string()));
        }

        let principal = UserPrincipal {
            id: UserId::new(),
            name: new.name,
            email: new.email,
            user_type: new.user_type,
            is_active: true,
            email_verified: new.email_verified,
        };
        state.users.insert(
            principal.id,
            UserRecord {
                principal: principal.clone(),
                mobile: None,
                password_hash: Some(new.password_hash),
                source: None,
            },
        );
        Ok(principal)
    }
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn load_principal(
        &self,
        kind: PrincipalKind,
        subject: Uuid,
    ) -> Result<Option<Principal>, StoreError> {
        self.enter().await?;
        let state = self.state.read().await;

        let principal = match kind {
            PrincipalKind::Admin => state
                .admins
                .get(&AdminId::from_uuid(subject))
                .map(|a| Principal::Admin(a.principal.clone())),
            PrincipalKind::User => state
                .users
                .get(&UserId::from_uuid(subject))
                .filter(|u| u.source.is_none())
                .map(|u| Principal::User(u.principal.clone())),
            PrincipalKind::Institute => {
                let shadow_id = UserId::from_uuid(subject);
                state
                    .users
                    .get(&shadow_id)
                    .and_then(|u| match u.source {
                        Some((UserType::Institute, sid)) => Some(sid),
                        _ => None,
                    })
                    .and_then(|sid| state.institutes.get(&InstituteId::from_uuid(sid)))
                    .map(|record| {
                        let i = &record.institute;
                        Principal::Institute(InstitutePrincipal {
                            id: i.id,
                            name: i.name.clone(),
                            email: i.email.clone(),
                            mobile: i.mobile.clone(),
                            is_active: i.is_active,
                            role_id: i.role_id,
                            role_revoked_at: record.role_revoked_at,
                            shadow_user_id: shadow_id,
                        })
                    })
            }
            PrincipalKind::Faculty => {
                let shadow_id = UserId::from_uuid(subject);
                state
                    .users
                    .get(&shadow_id)
                    .and_then(|u| match u.source {
                        Some((UserType::Faculty, sid)) => Some(sid),
                        _ => None,
                    })
                    .and_then(|sid| state.faculties.get(&FacultyId::from_uuid(sid)))
                    .map(|record| {
                        let f = &record.faculty;
                        Principal::Faculty(FacultyPrincipal {
                            id: f.id,
                            institute_id: f.institute_id,
                            department_id: f.department_id,
                            name: f.name.clone(),
                            email: f.email.clone(),
                            mobile: f.mobile.clone(),
                            is_active: f.is_active,
                            role_id: f.role_id,
                            role_revoked_at: record.role_revoked_at,
                            shadow_user_id: shadow_id,
                        })
                    })
            }
        };

        Ok(principal)
    }

    async fn user_permission_keys(
        &self,
        user_id: UserId,
    ) -> Result<Option<Vec<String>>, StoreError> {
        self.enter().await?;
        let state = self.state.read().await;
        if !state.users.contains_key(&user_id) {
            return Ok(None);
        }

        let keys: BTreeSet<String> = state
            .user_roles
            .get(&user_id)
            .into_iter()
            .flatten()
            .flat_map(|role_id| state.keys_of_role(*role_id))
            .collect();
        Ok(Some(keys.into_iter().collect()))
    }

    async fn role_permission_keys(
        &self,
        role_id: RoleId,
    ) -> Result<Option<Vec<String>>, StoreError> {
        self.enter().await?;
        let state = self.state.read().await;
        if !state.roles.contains_key(&role_id) {
            return Ok(None);
        }
        Ok(Some(state.keys_of_role(role_id)))
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_admin_by_email(
        &self,
        email: &str,
    ) -> Result<Option<AdminCredentials>, StoreError> {
        self.enter().await?;
        Ok(self
            .state
            .read()
            .await
            .admins
            .values()
            .find(|a| a.principal.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_active_institute_by_email(
        &self,
        email: &str,
    ) -> Result<Option<InstituteCredentials>, StoreError> {
        self.enter().await?;
        Ok(self
            .state
            .read()
            .await
            .institutes
            .values()
            .find(|r| r.institute.is_active && r.institute.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_active_faculty_by_email(
        &self,
        email: &str,
    ) -> Result<Option<FacultyCredentials>, StoreError> {
        self.enter().await?;
        Ok(self
            .state
            .read()
            .await
            .faculties
            .values()
            .find(|r| r.faculty.is_active && r.faculty.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserCredentials>, StoreError> {
        self.enter().await?;
        Ok(self
            .state
            .read()
            .await
            .users
            .values()
            .filter(|u| u.source.is_none())
            .find(|u| u.principal.email.eq_ignore_ascii_case(email))
            .and_then(|u| {
                u.password_hash.clone().map(|password_hash| UserCredentials {
                    principal: u.principal.clone(),
                    password_hash,
                })
            }))
    }

    async fn upsert_shadow_user(&self, shadow: &ShadowUser) -> Result<UserId, StoreError> {
        self.enter().await?;
        // Lookup and write happen under one write guard, like ON CONFLICT.
        let mut state = self.state.write().await;
        let source = (shadow.source_kind, shadow.source_id);

        let existing = state
            .users
            .iter()
            .find(|(_, u)| u.source == Some(source))
            .map(|(id, _)| *id);

        let id = existing.unwrap_or_else(UserId::new);
        let email_verified = existing.is_none()
            || state
                .users
                .get(&id)
                .map(|u| u.principal.email_verified)
                .unwrap_or(true);

        state.users.insert(
            id,
            UserRecord {
                principal: UserPrincipal {
                    id,
                    name: shadow.name.clone(),
                    email: shadow.email.clone(),
                    user_type: shadow.source_kind,
                    is_active: shadow.is_active,
                    email_verified,
                },
                mobile: shadow.mobile.clone(),
                password_hash: None,
                source: Some(source),
            },
        );
        Ok(id)
    }
}

#[async_trait]
impl RoleStore for MemoryStore {
    async fn create_role(&self, new: NewRole) -> Result<RoleWithPermissions, StoreError> {
        self.enter().await?;
        let mut state = self.state.write().await;
        state.ensure_permissions(&new.permission_ids)?;
        if state.roles.values().any(|r| r.role_key == new.role_key) {
            return Err(StoreError::Conflict("role key".to_string()));
        }

        let now = Utc::now();
        let role = Role {
            id: RoleId::new(),
            role_name: new.role_name,
            role_key: new.role_key,
            role_description: new.role_description,
            is_default: new.is_default,
            created_at: now,
            updated_at: now,
        };
        let id = role.id;
        state.roles.insert(id, role);
        state
            .role_permissions
            .insert(id, new.permission_ids.into_iter().collect());

        state
            .role_with_permissions(id)
            .ok_or_else(|| StoreError::Corrupt(format!("role {} missing after insert", id)))
    }

    async fn update_role(
        &self,
        id: RoleId,
        changes: RoleChanges,
    ) -> Result<Option<RoleWithPermissions>, StoreError> {
        self.enter().await?;
        let mut state = self.state.write().await;
        if !state.roles.contains_key(&id) {
            return Ok(None);
        }
        if let Some(ids) = &changes.permission_ids {
            state.ensure_permissions(ids)?;
        }

        if let Some(role) = state.roles.get_mut(&id) {
            if let Some(name) = changes.role_name {
                role.role_name = name;
            }
            if let Some(description) = changes.role_description {
                role.role_description = Some(description);
            }
            if let Some(is_default) = changes.is_default {
                role.is_default = is_default;
            }
            role.updated_at = Utc::now();
        }
        if let Some(ids) = changes.permission_ids {
            state.role_permissions.insert(id, ids.into_iter().collect());
        }

        Ok(state.role_with_permissions(id))
    }

    async fn sync_role_permissions(
        &self,
        id: RoleId,
        permission_ids: &[PermissionId],
    ) -> Result<Option<RoleWithPermissions>, StoreError> {
        self.enter().await?;
        let mut state = self.state.write().await;
        if !state.roles.contains_key(&id) {
            return Ok(None);
        }
        state.ensure_permissions(permission_ids)?;
        state
            .role_permissions
            .insert(id, permission_ids.iter().copied().collect());
        if let Some(role) = state.roles.get_mut(&id) {
            role.updated_at = Utc::now();
        }
        Ok(state.role_with_permissions(id))
    }

    async fn get_role(&self, id: RoleId) -> Result<Option<RoleWithPermissions>, StoreError> {
        self.enter().await?;
        Ok(self.state.read().await.role_with_permissions(id))
    }

    async fn list_roles(
        &self,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<RoleWithPermissions>, i64), StoreError> {
        self.enter().await?;
        let state = self.state.read().await;
        let mut roles: Vec<&Role> = state
            .roles
            .values()
            .filter(|r| matches_search(search, &[&r.role_name, &r.role_key]))
            .collect();
        roles.sort_by(|a, b| a.role_name.cmp(&b.role_name).then(a.id.cmp(&b.id)));

        let with_permissions = roles
            .into_iter()
            .filter_map(|r| state.role_with_permissions(r.id))
            .collect();
        Ok(page(with_permissions, limit, offset))
    }

    async fn delete_role(&self, id: RoleId) -> Result<bool, StoreError> {
        self.enter().await?;
        let mut state = self.state.write().await;
        if state.roles.remove(&id).is_none() {
            return Ok(false);
        }
        state.role_permissions.remove(&id);
        for roles in state.user_roles.values_mut() {
            roles.remove(&id);
        }
        let now = Utc::now();
        for record in state.institutes.values_mut() {
            if record.institute.role_id == Some(id) {
                record.institute.role_id = None;
                record.institute.updated_at = now;
                record.role_revoked_at = Some(now);
            }
        }
        for record in state.faculties.values_mut() {
            if record.faculty.role_id == Some(id) {
                record.faculty.role_id = None;
                record.faculty.updated_at = now;
                record.role_revoked_at = Some(now);
            }
        }
        Ok(true)
    }

    async fn list_permissions(&self) -> Result<Vec<Permission>, StoreError> {
        self.enter().await?;
        let mut permissions: Vec<Permission> =
            self.state.read().await.permissions.values().cloned().collect();
        permissions.sort_by(|a, b| a.permission_key.cmp(&b.permission_key));
        Ok(permissions)
    }

    async fn upsert_permissions(&self, entries: &[NewPermission]) -> Result<u64, StoreError> {
        self.enter().await?;
        let mut state = self.state.write().await;
        for entry in entries {
            let existing = state
                .permissions
                .values_mut()
                .find(|p| p.permission_key == entry.permission_key);
            match existing {
                Some(permission) => permission.permission_name = entry.permission_name.clone(),
                None => {
                    let id = PermissionId::new();
                    state.permissions.insert(
                        id,
                        Permission {
                            id,
                            permission_name: entry.permission_name.clone(),
                            permission_key: entry.permission_key.clone(),
                            created_at: Utc::now(),
                        },
                    );
                }
            }
        }
        Ok(entries.len() as u64)
    }

    async fn find_role_by_key(&self, role_key: &str) -> Result<Option<Role>, StoreError> {
        self.enter().await?;
        Ok(self
            .state
            .read()
            .await
            .roles
            .values()
            .find(|r| r.role_key == role_key)
            .cloned())
    }

    async fn assign_user_roles(
        &self,
        user_id: UserId,
        role_ids: &[RoleId],
    ) -> Result<Option<Vec<Role>>, StoreError> {
        self.enter().await?;
        {
            let mut state = self.state.write().await;
            if !state.users.contains_key(&user_id) {
                return Ok(None);
            }
            state.ensure_roles(role_ids)?;
            state
                .user_roles
                .insert(user_id, role_ids.iter().copied().collect());
        }
        self.user_roles(user_id).await
    }

    async fn user_roles(&self, user_id: UserId) -> Result<Option<Vec<Role>>, StoreError> {
        self.enter().await?;
        let state = self.state.read().await;
        if !state.users.contains_key(&user_id) {
            return Ok(None);
        }
        let mut roles: Vec<Role> = state
            .user_roles
            .get(&user_id)
            .into_iter()
            .flatten()
            .filter_map(|id| state.roles.get(id).cloned())
            .collect();
        roles.sort_by(|a, b| a.role_name.cmp(&b.role_name));
        Ok(Some(roles))
    }
}

#[async_trait]
impl DirectoryStore for MemoryStore {
    async fn create_department(
        &self,
        institute_id: InstituteId,
        _name: &str,
    ) -> Result<DepartmentId, StoreError> {
        self.enter().await?;
        let mut state = self.state.write().await;
        if !state.institutes.contains_key(&institute_id) {
            return Err(StoreError::InvalidReference("institute".to_string()));
        }
        let id = DepartmentId::new();
        state.departments.insert(id, institute_id);
        Ok(id)
    }

    async fn create_institute(&self, new: NewInstitute) -> Result<Institute, StoreError> {
        self.enter().await?;
        let mut state = self.state.write().await;
        if let Some(role_id) = new.role_id {
            state.ensure_roles(&[role_id])?;
        }
        if State::email_taken(
            state.institutes.values().map(|r| r.institute.email.as_str()),
            &new.email,
        ) {
            return Err(StoreError::Conflict("institute email".to_string()));
        }

        let now = Utc::now();
        let institute = Institute {
            id: InstituteId::new(),
            name: new.name,
            email: new.email,
            mobile: new.mobile,
            is_active: true,
            role_id: new.role_id,
            created_at: now,
            updated_at: now,
        };
        state.institutes.insert(
            institute.id,
            InstituteCredentials {
                institute: institute.clone(),
                password_hash: new.password_hash,
                role_revoked_at: None,
            },
        );
        Ok(institute)
    }

    async fn list_institutes(
        &self,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Institute>, i64), StoreError> {
        self.enter().await?;
        let state = self.state.read().await;
        let mut institutes: Vec<Institute> = state
            .institutes
            .values()
            .map(|r| r.institute.clone())
            .filter(|i| matches_search(search, &[&i.name, &i.email]))
            .collect();
        institutes.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(page(institutes, limit, offset))
    }

    async fn get_institute(&self, id: InstituteId) -> Result<Option<Institute>, StoreError> {
        self.enter().await?;
        Ok(self
            .state
            .read()
            .await
            .institutes
            .get(&id)
            .map(|r| r.institute.clone()))
    }

    async fn link_institute_role(
        &self,
        id: InstituteId,
        role_id: Option<RoleId>,
    ) -> Result<Option<Institute>, StoreError> {
        self.enter().await?;
        let mut state = self.state.write().await;
        if let Some(role_id) = role_id {
            state.ensure_roles(&[role_id])?;
        }
        Ok(state.institutes.get_mut(&id).map(|record| {
            record.institute.role_id = role_id;
            record.institute.updated_at = Utc::now();
            record.institute.clone()
        }))
    }

    async fn create_faculty(&self, new: NewFaculty) -> Result<Faculty, StoreError> {
        self.enter().await?;
        let mut state = self.state.write().await;
        if !state.institutes.contains_key(&new.institute_id) {
            return Err(StoreError::InvalidReference("institute".to_string()));
        }
        if let Some(department_id) = new.department_id
            && state.departments.get(&department_id) != Some(&new.institute_id)
        {
            return Err(StoreError::InvalidReference("department".to_string()));
        }
        if let Some(role_id) = new.role_id {
            state.ensure_roles(&[role_id])?;
        }
        if State::email_taken(
            state.faculties.values().map(|r| r.faculty.email.as_str()),
            &new.email,
        ) {
            return Err(StoreError::Conflict("faculty email".to_string()));
        }

        let now = Utc::now();
        let faculty = Faculty {
            id: FacultyId::new(),
            institute_id: new.institute_id,
            department_id: new.department_id,
            name: new.name,
            email: new.email,
            mobile: new.mobile,
            is_active: true,
            role_id: new.role_id,
            created_at: now,
            updated_at: now,
        };
        state.faculties.insert(
            faculty.id,
            FacultyCredentials {
                faculty: faculty.clone(),
                password_hash: new.password_hash,
                role_revoked_at: None,
            },
        );
        Ok(faculty)
    }

    async fn list_faculties(
        &self,
        institute_id: Option<InstituteId>,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Faculty>, i64), StoreError> {
        self.enter().await?;
        let state = self.state.read().await;
        let mut faculties: Vec<Faculty> = state
            .faculties
            .values()
            .map(|r| r.faculty.clone())
            .filter(|f| institute_id.is_none_or(|id| f.institute_id == id))
            .filter(|f| matches_search(search, &[&f.name, &f.email]))
            .collect();
        faculties.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(page(faculties, limit, offset))
    }

    async fn get_faculty(&self, id: FacultyId) -> Result<Option<Faculty>, StoreError> {
        self.enter().await?;
        Ok(self
            .state
            .read()
            .await
            .faculties
            .get(&id)
            .map(|r| r.faculty.clone()))
    }

    async fn link_faculty_role(
        &self,
        id: FacultyId,
        role_id: Option<RoleId>,
    ) -> Result<Option<Faculty>, StoreError> {
        self.enter().await?;
        let mut state = self.state.write().await;
        if let Some(role_id) = role_id {
            state.ensure_roles(&[role_id])?;
        }
        Ok(state.faculties.get_mut(&id).map(|record| {
            record.faculty.role_id = role_id;
            record.faculty.updated_at = Utc::now();
            record.faculty.clone()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_models::AdminType;

    fn new_institute(email: &str) -> NewInstitute {
        NewInstitute {
            name: "Northfield College".to_string(),
            email: email.to_string(),
            mobile: Some("+15550100".to_string()),
            password_hash: "hash".to_string(),
            role_id: None,
        }
    }

    #[tokio::test]
    async fn test_with_catalog_seeds_every_key() {
        let store = MemoryStore::with_catalog().await;
        let permissions = store.list_permissions().await.unwrap();
        assert_eq!(permissions.len(), PermissionKey::ALL.len());
        assert!(store.permission_id("lecture_view").await.is_some());
    }

    #[tokio::test]
    async fn test_shadow_upsert_is_keyed_by_source() {
        let store = MemoryStore::new();
        let institute = store
            .create_institute(new_institute("registrar@northfield.edu"))
            .await
            .unwrap();

        let mut shadow = ShadowUser::of_institute(&institute);
        let first = store.upsert_shadow_user(&shadow).await.unwrap();
        shadow.mobile = Some("+15550199".to_string());
        let second = store.upsert_shadow_user(&shadow).await.unwrap();

        assert_eq!(first, second);
        let rows = store.shadow_users_of(institute.id.into_inner()).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].1.mobile.as_deref(), Some("+15550199"));
    }

    #[tokio::test]
    async fn test_sync_role_permissions_replaces_set() {
        let store = MemoryStore::with_catalog().await;
        let view = store.permission_id("lecture_view").await.unwrap();
        let list = store.permission_id("lecture_list").await.unwrap();
        let role = store
            .create_role(NewRole {
                role_name: "Tutor".to_string(),
                role_key: "tutor".to_string(),
                role_description: None,
                is_default: false,
                permission_ids: vec![view, list],
            })
            .await
            .unwrap();

        let synced = store
            .sync_role_permissions(role.role.id, &[view])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(synced.permissions.len(), 1);

        let again = store
            .sync_role_permissions(role.role.id, &[view])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(again.permissions, synced.permissions);
    }

    #[tokio::test]
    async fn test_unknown_permission_id_is_rejected() {
        let store = MemoryStore::with_catalog().await;
        let err = store
            .create_role(NewRole {
                role_name: "Ghost".to_string(),
                role_key: "ghost".to_string(),
                role_description: None,
                is_default: false,
                permission_ids: vec![PermissionId::new()],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidReference(_)));
    }

    #[tokio::test]
    async fn test_delete_role_unlinks_and_stamps_institutes() {
        let store = MemoryStore::with_catalog().await;
        let role = store
            .create_role(NewRole {
                role_name: "Institute".to_string(),
                role_key: "institute".to_string(),
                role_description: None,
                is_default: true,
                permission_ids: vec![],
            })
            .await
            .unwrap();
        let mut new = new_institute("a@northfield.edu");
        new.role_id = Some(role.role.id);
        let institute = store.create_institute(new).await.unwrap();

        let untouched = store
            .create_institute(new_institute("b@northfield.edu"))
            .await
            .unwrap();

        assert!(store.delete_role(role.role.id).await.unwrap());
        let reloaded = store.get_institute(institute.id).await.unwrap().unwrap();
        assert_eq!(reloaded.role_id, None);

        let stamped = store
            .find_active_institute_by_email("a@northfield.edu")
            .await
            .unwrap()
            .unwrap();
        assert!(stamped.role_revoked_at.is_some());
        let other = store
            .find_active_institute_by_email(&untouched.email)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(other.role_revoked_at, None);
    }

    #[tokio::test]
    async fn test_unavailable_fails_every_call() {
        let store = MemoryStore::new();
        store
            .create_admin(NewAdmin {
                name: "Root".to_string(),
                email: "root@lectern.dev".to_string(),
                password_hash: "hash".to_string(),
                user_type: AdminType::SuperAdmin,
            })
            .await
            .unwrap();

        store.set_unavailable(true);
        assert!(matches!(
            store.find_admin_by_email("root@lectern.dev").await,
            Err(StoreError::Unavailable(_))
        ));
        store.set_unavailable(false);
        assert!(
            store
                .find_admin_by_email("ROOT@lectern.dev")
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_duplicate_standalone_user_email_conflicts() {
        let store = MemoryStore::new();
        let new = NewUser {
            name: "Jane".to_string(),
            email: "jane@example.com".to_string(),
            password_hash: "hash".to_string(),
            user_type: UserType::Default,
            email_verified: true,
        };
        store.create_user(new.clone()).await.unwrap();
        assert!(matches!(
            store.create_user(new).await,
            Err(StoreError::Conflict(_))
        ));
    }
}
