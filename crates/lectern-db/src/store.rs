//! Store traits the authorization core and the admin endpoints talk to.
//!
//! Every method is a suspension point. Callers on the authorization path bound
//! each call with a timeout; the stores themselves do not.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use lectern_models::{
    AdminPrincipal, DepartmentId, Faculty, FacultyId, Institute, InstituteId, Permission,
    PermissionId, Principal, PrincipalKind, Role, RoleId, RoleWithPermissions, UserId,
    UserPrincipal, UserType,
};

use crate::error::StoreError;

/// Read side of the identity tables and the role-permission graph.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Loads the principal a validated token names.
    ///
    /// `subject` is the admin id for [`PrincipalKind::Admin`] and the user id
    /// (the shadow row for institutes and faculties) otherwise. `Ok(None)` means
    /// the record no longer exists.
    async fn load_principal(
        &self,
        kind: PrincipalKind,
        subject: Uuid,
    ) -> Result<Option<Principal>, StoreError>;

    /// Permission keys over all roles attached to a user, de-duplicated.
    ///
    /// `Ok(None)` when the user row is gone.
    async fn user_permission_keys(&self, user_id: UserId)
    -> Result<Option<Vec<String>>, StoreError>;

    /// Permission keys of one role. `Ok(None)` when the role is gone.
    async fn role_permission_keys(&self, role_id: RoleId)
    -> Result<Option<Vec<String>>, StoreError>;
}

#[derive(Debug, Clone)]
pub struct AdminCredentials {
    pub principal: AdminPrincipal,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct InstituteCredentials {
    pub institute: Institute,
    pub password_hash: String,
    pub role_revoked_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct FacultyCredentials {
    pub faculty: Faculty,
    pub password_hash: String,
    pub role_revoked_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub principal: UserPrincipal,
    pub password_hash: String,
}

/// Projection of an institute or faculty into the generic user table.
///
/// Rows are matched on `(source_kind, source_id)`, never on email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowUser {
    pub source_kind: UserType,
    pub source_id: Uuid,
    pub name: String,
    pub email: String,
    pub mobile: Option<String>,
    pub is_active: bool,
}

impl ShadowUser {
    pub fn of_institute(institute: &Institute) -> Self {
        Self {
            source_kind: UserType::Institute,
            source_id: institute.id.into_inner(),
            name: institute.name.clone(),
            email: institute.email.clone(),
            mobile: institute.mobile.clone(),
            is_active: institute.is_active,
        }
    }

    pub fn of_faculty(faculty: &Faculty) -> Self {
        Self {
            source_kind: UserType::Faculty,
            source_id: faculty.id.into_inner(),
            name: faculty.name.clone(),
            email: faculty.email.clone(),
            mobile: faculty.mobile.clone(),
            is_active: faculty.is_active,
        }
    }
}

/// Credential lookups used by login, in the order login tries them.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_admin_by_email(&self, email: &str)
    -> Result<Option<AdminCredentials>, StoreError>;

    async fn find_active_institute_by_email(
        &self,
        email: &str,
    ) -> Result<Option<InstituteCredentials>, StoreError>;

    async fn find_active_faculty_by_email(
        &self,
        email: &str,
    ) -> Result<Option<FacultyCredentials>, StoreError>;

    /// Standalone users only. Shadow rows have no password of their own.
    async fn find_user_by_email(&self, email: &str)
    -> Result<Option<UserCredentials>, StoreError>;

    /// Inserts or refreshes the shadow row in one atomic statement.
    async fn upsert_shadow_user(&self, shadow: &ShadowUser) -> Result<UserId, StoreError>;
}

#[derive(Debug, Clone)]
pub struct NewRole {
    pub role_name: String,
    pub role_key: String,
    pub role_description: Option<String>,
    pub is_default: bool,
    pub permission_ids: Vec<PermissionId>,
}

#[derive(Debug, Clone, Default)]
pub struct RoleChanges {
    pub role_name: Option<String>,
    pub role_description: Option<String>,
    pub is_default: Option<bool>,
    /// Replaces the role's permission set when present.
    pub permission_ids: Option<Vec<PermissionId>>,
}

#[derive(Debug, Clone)]
pub struct NewPermission {
    pub permission_key: String,
    pub permission_name: String,
}

/// Administrative mutations of the role-permission graph.
///
/// Permission and role assignments are set-replace: the stored set becomes
/// exactly the given ids, so repeating a call changes nothing.
#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn create_role(&self, new: NewRole) -> Result<RoleWithPermissions, StoreError>;

    async fn update_role(
        &self,
        id: RoleId,
        changes: RoleChanges,
    ) -> Result<Option<RoleWithPermissions>, StoreError>;

    async fn sync_role_permissions(
        &self,
        id: RoleId,
        permission_ids: &[PermissionId],
    ) -> Result<Option<RoleWithPermissions>, StoreError>;

    async fn get_role(&self, id: RoleId) -> Result<Option<RoleWithPermissions>, StoreError>;

    async fn list_roles(
        &self,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<RoleWithPermissions>, i64), StoreError>;

    async fn delete_role(&self, id: RoleId) -> Result<bool, StoreError>;

    async fn list_permissions(&self) -> Result<Vec<Permission>, StoreError>;

    /// Inserts missing catalog rows and refreshes display names of existing ones.
    async fn upsert_permissions(&self, entries: &[NewPermission]) -> Result<u64, StoreError>;

    async fn find_role_by_key(&self, role_key: &str) -> Result<Option<Role>, StoreError>;

    async fn assign_user_roles(
        &self,
        user_id: UserId,
        role_ids: &[RoleId],
    ) -> Result<Option<Vec<Role>>, StoreError>;

    async fn user_roles(&self, user_id: UserId) -> Result<Option<Vec<Role>>, StoreError>;
}

#[derive(Debug, Clone)]
pub struct NewAdmin {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub user_type: lectern_models::AdminType,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub user_type: UserType,
    pub email_verified: bool,
}

/// Account creation used by the CLI.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn create_admin(&self, new: NewAdmin) -> Result<AdminPrincipal, StoreError>;

    /// Standalone user with its own password.
    async fn create_user(&self, new: NewUser) -> Result<UserPrincipal, StoreError>;
}

#[derive(Debug, Clone)]
pub struct NewInstitute {
    pub name: String,
    pub email: String,
    pub mobile: Option<String>,
    pub password_hash: String,
    pub role_id: Option<RoleId>,
}

#[derive(Debug, Clone)]
pub struct NewFaculty {
    pub institute_id: InstituteId,
    pub department_id: Option<DepartmentId>,
    pub name: String,
    pub email: String,
    pub mobile: Option<String>,
    pub password_hash: String,
    pub role_id: Option<RoleId>,
}

/// Institute and faculty records.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    async fn create_department(
        &self,
        institute_id: InstituteId,
        name: &str,
    ) -> Result<DepartmentId, StoreError>;

    async fn create_institute(&self, new: NewInstitute) -> Result<Institute, StoreError>;

    async fn list_institutes(
        &self,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Institute>, i64), StoreError>;

    async fn get_institute(&self, id: InstituteId) -> Result<Option<Institute>, StoreError>;

    async fn link_institute_role(
        &self,
        id: InstituteId,
        role_id: Option<RoleId>,
    ) -> Result<Option<Institute>, StoreError>;

    async fn create_faculty(&self, new: NewFaculty) -> Result<Faculty, StoreError>;

    async fn list_faculties(
        &self,
        institute_id: Option<InstituteId>,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Faculty>, i64), StoreError>;

    async fn get_faculty(&self, id: FacultyId) -> Result<Option<Faculty>, StoreError>;

    async fn link_faculty_role(
        &self,
        id: FacultyId,
        role_id: Option<RoleId>,
    ) -> Result<Option<Faculty>, StoreError>;
}
