//! PostgreSQL implementation of the store traits.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool};
use tracing::{debug, instrument};
use uuid::Uuid;

use lectern_models::{
    AdminId, AdminPrincipal, AdminType, DepartmentId, Faculty, FacultyId, FacultyPrincipal,
    Institute, InstituteId, InstitutePrincipal, Permission, PermissionId, Principal,
    PrincipalKind, Role, RoleId, RoleWithPermissions, UserId, UserPrincipal, UserType,
};

use crate::error::StoreError;
use crate::store::{
    AccountStore, AdminCredentials, CredentialStore, DirectoryStore, FacultyCredentials, IdentityStore,
    InstituteCredentials, NewAdmin, NewFaculty, NewInstitute, NewPermission, NewRole, NewUser,
    RoleChanges, RoleStore, ShadowUser, UserCredentials,
};

#[derive(FromRow)]
struct AdminRow {
    id: AdminId,
    name: String,
    email: String,
    password_hash: String,
    #[sqlx(try_from = "String")]
    user_type: AdminType,
    is_active: bool,
}

impl AdminRow {
    fn into_credentials(self) -> AdminCredentials {
        AdminCredentials {
            principal: AdminPrincipal {
                id: self.id,
                name: self.name,
                email: self.email,
                user_type: self.user_type,
                is_active: self.is_active,
            },
            password_hash: self.password_hash,
        }
    }
}

#[derive(FromRow)]
struct UserRow {
    id: UserId,
    name: String,
    email: String,
    password_hash: Option<String>,
    #[sqlx(try_from = "String")]
    user_type: UserType,
    is_active: bool,
    email_verified: bool,
}

impl UserRow {
    fn principal(&self) -> UserPrincipal {
        UserPrincipal {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            user_type: self.user_type,
            is_active: self.is_active,
            email_verified: self.email_verified,
        }
    }
}

#[derive(FromRow)]
struct InstitutePrincipalRow {
    id: InstituteId,
    name: String,
    email: String,
    mobile: Option<String>,
    is_active: bool,
    role_id: Option<RoleId>,
    role_revoked_at: Option<DateTime<Utc>>,
    shadow_user_id: UserId,
}

#[derive(FromRow)]
struct FacultyPrincipalRow {
    id: FacultyId,
    institute_id: InstituteId,
    department_id: Option<DepartmentId>,
    name: String,
    email: String,
    mobile: Option<String>,
    is_active: bool,
    role_id: Option<RoleId>,
    role_revoked_at: Option<DateTime<Utc>>,
    shadow_user_id: UserId,
}

#[derive(FromRow)]
struct InstituteCredentialRow {
    #[sqlx(flatten)]
    institute: Institute,
    password_hash: String,
    role_revoked_at: Option<DateTime<Utc>>,
}

#[derive(FromRow)]
struct FacultyCredentialRow {
    #[sqlx(flatten)]
    faculty: Faculty,
    password_hash: String,
    role_revoked_at: Option<DateTime<Utc>>,
}

#[derive(FromRow)]
struct RolePermissionRow {
    role_id: RoleId,
    #[sqlx(flatten)]
    permission: Permission,
}

/// Store backed by a Postgres pool. Cheap to clone.
#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }


    async fn attach_permissions(
        &self,
        roles: Vec<Role>,
    ) -> Result<Vec<RoleWithPermissions>, StoreError> {
        if roles.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<RoleId> = roles.iter().map(|r| r.id).collect();
        let rows = sqlx::query_as::<_, RolePermissionRow>(
            r#"
            SELECT rp.role_id, p.id, p.permission_name, p.permission_key, p.created_at
            FROM role_permissions rp
            JOIN permissions p ON p.id = rp.permission_id
            WHERE rp.role_id = ANY($1)
            ORDER BY p.permission_key
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_role: HashMap<RoleId, Vec<Permission>> = HashMap::new();
        for row in rows {
            by_role.entry(row.role_id).or_default().push(row.permission);
        }

        Ok(roles
            .into_iter()
            .map(|role| {
                let permissions = by_role.remove(&role.id).unwrap_or_default();
                RoleWithPermissions { role, permissions }
            })
            .collect())
    }

    async fn role_with_permissions(
        &self,
        id: RoleId,
    ) -> Result<Option<RoleWithPermissions>, StoreError> {
        let role = sqlx::query_as::<_, Role>(
            r#"
            SELECT id, role_name, role_key, role_description, is_default, created_at, updated_at
            FROM roles WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match role {
            Some(role) => Ok(self.attach_permissions(vec![role]).await?.pop()),
            None => Ok(None),
        }
    }
}

async fn ensure_permissions_exist(
    conn: &mut PgConnection,
    ids: &[PermissionId],
) -> Result<(), StoreError> {
    let unique: BTreeSet<PermissionId> = ids.iter().copied().collect();
    if unique.is_empty() {
        return Ok(());
    }

    let found: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM permissions WHERE id = ANY($1)")
            .bind(unique.iter().copied().collect::<Vec<_>>())
            .fetch_one(&mut *conn)
            .await?;

    if found != unique.len() as i64 {
        return Err(StoreError::InvalidReference("permission id".to_string()));
    }
    Ok(())
}

async fn ensure_roles_exist(conn: &mut PgConnection, ids: &[RoleId]) -> Result<(), StoreError> {
    let unique: BTreeSet<RoleId> = ids.iter().copied().collect();
    if unique.is_empty() {
        return Ok(());
    }

    let found: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM roles WHERE id = ANY($1)")
        .bind(unique.iter().copied().collect::<Vec<_>>())
        .fetch_one(&mut *conn)
        .await?;

    if found != unique.len() as i64 {
        return Err(StoreError::InvalidReference("role id".to_string()));
    }
    Ok(())
}

async fn replace_role_permissions(
    conn: &mut PgConnection,
    role_id: RoleId,
    ids: &[PermissionId],
) -> Result<(), StoreError> {
    sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
        .bind(role_id)
        .execute(&mut *conn)
        .await?;

    if !ids.is_empty() {
        sqlx::query(
            r#"
            INSERT INTO role_permissions (role_id, permission_id)
            SELECT $1, UNNEST($2::uuid[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(role_id)
        .bind(ids.to_vec())
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

#[async_trait]
impl AccountStore for PgStore {
    #[instrument(skip(self, new), fields(email = %new.email))]
    async fn create_admin(&self, new: NewAdmin) -> Result<AdminPrincipal, StoreError> {
        let row = sqlx::query_as::<_, AdminRow>(
            r#"
            INSERT INTO admins (name, email, password_hash, user_type)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, email, password_hash, user_type, is_active
            "#,
        )
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(new.user_type.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::from_sqlx(e, "admin email"))?;

        Ok(row.into_credentials().principal)
    }

    #[instrument(skip(self, new), fields(email = %new.email))]
    async fn create_user(&self, new: NewUser) -> Result<UserPrincipal, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (name, email, password_hash, user_type, email_verified)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, email, password_hash, user_type, is_active, email_verified
            "#,
        )
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(new.user_type.as_str())
        .bind(new.email_verified)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::from_sqlx(e, "user email"))?;

        Ok(row.principal())
    }
}

#[async_trait]
impl IdentityStore for PgStore {
    #[instrument(skip(self))]
    async fn load_principal(
        &self,
        kind: PrincipalKind,
        subject: Uuid,
    ) -> Result<Option<Principal>, StoreError> {
        let principal = match kind {
            PrincipalKind::Admin => sqlx::query_as::<_, AdminRow>(
                "SELECT id, name, email, password_hash, user_type, is_active FROM admins WHERE id = $1",
            )
            .bind(subject)
            .fetch_optional(&self.pool)
            .await?
            .map(|row| Principal::Admin(row.into_credentials().principal)),

            PrincipalKind::Institute => sqlx::query_as::<_, InstitutePrincipalRow>(
                r#"
                SELECT i.id, i.name, i.email, i.mobile, i.is_active, i.role_id,
                       i.role_revoked_at, u.id AS shadow_user_id
                FROM users u
                JOIN institutes i ON i.id = u.source_id
                WHERE u.id = $1 AND u.source_kind = 'institute'
                "#,
            )
            .bind(subject)
            .fetch_optional(&self.pool)
            .await?
            .map(|row| {
                Principal::Institute(InstitutePrincipal {
                    id: row.id,
                    name: row.name,
                    email: row.email,
                    mobile: row.mobile,
                    is_active: row.is_active,
                    role_id: row.role_id,
                    role_revoked_at: row.role_revoked_at,
                    shadow_user_id: row.shadow_user_id,
                })
            }),

            PrincipalKind::Faculty => sqlx::query_as::<_, FacultyPrincipalRow>(
                r#"
                SELECT f.id, f.institute_id, f.department_id, f.name, f.email, f.mobile,
                       f.is_active, f.role_id, f.role_revoked_at, u.id AS shadow_user_id
                FROM users u
                JOIN faculties f ON f.id = u.source_id
                WHERE u.id = $1 AND u.source_kind = 'faculty'
                "#,
            )
            .bind(subject)
            .fetch_optional(&self.pool)
            .await?
            .map(|row| {
                Principal::Faculty(FacultyPrincipal {
                    id: row.id,
                    institute_id: row.institute_id,
                    department_id: row.department_id,
                    name: row.name,
                    email: row.email,
                    mobile: row.mobile,
                    is_active: row.is_active,
                    role_id: row.role_id,
                    role_revoked_at: row.role_revoked_at,
                    shadow_user_id: row.shadow_user_id,
                })
            }),

            PrincipalKind::User => sqlx::query_as::<_, UserRow>(
                r#"
                SELECT id, name, email, password_hash, user_type, is_active, email_verified
                FROM users WHERE id = $1 AND source_id IS NULL
                "#,
            )
            .bind(subject)
            .fetch_optional(&self.pool)
            .await?
            .map(|row| Principal::User(row.principal())),
        };

        debug!(found = principal.is_some(), "principal lookup");
        Ok(principal)
    }

    #[instrument(skip(self))]
    async fn user_permission_keys(
        &self,
        user_id: UserId,
    ) -> Result<Option<Vec<String>>, StoreError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        if !exists {
            return Ok(None);
        }

        let keys = sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT p.permission_key
            FROM user_roles ur
            JOIN role_permissions rp ON rp.role_id = ur.role_id
            JOIN permissions p ON p.id = rp.permission_id
            WHERE ur.user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(keys))
    }

    #[instrument(skip(self))]
    async fn role_permission_keys(
        &self,
        role_id: RoleId,
    ) -> Result<Option<Vec<String>>, StoreError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM roles WHERE id = $1)")
            .bind(role_id)
            .fetch_one(&self.pool)
            .await?;
        if !exists {
            return Ok(None);
        }

        let keys = sqlx::query_scalar::<_, String>(
            r#"
            SELECT p.permission_key
            FROM role_permissions rp
            JOIN permissions p ON p.id = rp.permission_id
            WHERE rp.role_id = $1
            "#,
        )
        .bind(role_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(keys))
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn find_admin_by_email(
        &self,
        email: &str,
    ) -> Result<Option<AdminCredentials>, StoreError> {
        let row = sqlx::query_as::<_, AdminRow>(
            r#"
            SELECT id, name, email, password_hash, user_type, is_active
            FROM admins WHERE LOWER(email) = LOWER($1)
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(AdminRow::into_credentials))
    }

    async fn find_active_institute_by_email(
        &self,
        email: &str,
    ) -> Result<Option<InstituteCredentials>, StoreError> {
        let row = sqlx::query_as::<_, InstituteCredentialRow>(
            r#"
            SELECT id, name, email, mobile, is_active, role_id, created_at, updated_at,
                   password_hash, role_revoked_at
            FROM institutes
            WHERE LOWER(email) = LOWER($1) AND is_active = TRUE
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| InstituteCredentials {
            institute: r.institute,
            password_hash: r.password_hash,
            role_revoked_at: r.role_revoked_at,
        }))
    }

    async fn find_active_faculty_by_email(
        &self,
        email: &str,
    ) -> Result<Option<FacultyCredentials>, StoreError> {
        let row = sqlx::query_as::<_, FacultyCredentialRow>(
            r#"
            SELECT id, institute_id, department_id, name, email, mobile, is_active, role_id,
                   created_at, updated_at, password_hash, role_revoked_at
            FROM faculties
            WHERE LOWER(email) = LOWER($1) AND is_active = TRUE
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| FacultyCredentials {
            faculty: r.faculty,
            password_hash: r.password_hash,
            role_revoked_at: r.role_revoked_at,
        }))
    }

    async fn find_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserCredentials>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, password_hash, user_type, is_active, email_verified
            FROM users
            WHERE LOWER(email) = LOWER($1) AND source_id IS NULL AND password_hash IS NOT NULL
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.and_then(|r| {
            let principal = r.principal();
            r.password_hash.map(|password_hash| UserCredentials {
                principal,
                password_hash,
            })
        }))
    }

    #[instrument(skip(self, shadow), fields(source_kind = shadow.source_kind.as_str(), source_id = %shadow.source_id))]
    async fn upsert_shadow_user(&self, shadow: &ShadowUser) -> Result<UserId, StoreError> {
        let id = sqlx::query_scalar::<_, UserId>(
            r#"
            INSERT INTO users (name, email, mobile, user_type, is_active, email_verified,
                               source_kind, source_id)
            VALUES ($1, $2, $3, $4, $5, TRUE, $4, $6)
            ON CONFLICT (source_kind, source_id) DO UPDATE
            SET name = EXCLUDED.name,
                email = EXCLUDED.email,
                mobile = EXCLUDED.mobile,
                is_active = EXCLUDED.is_active,
                updated_at = NOW()
            RETURNING id
            "#,
        )
        .bind(&shadow.name)
        .bind(&shadow.email)
        .bind(&shadow.mobile)
        .bind(shadow.source_kind.as_str())
        .bind(shadow.is_active)
        .bind(shadow.source_id)
        .fetch_one(&self.pool)
        .await?;

        debug!(user_id = %id, "shadow user synced");
        Ok(id)
    }
}

#[async_trait]
impl RoleStore for PgStore {
    #[instrument(skip(self, new), fields(role_key = %new.role_key))]
    async fn create_role(&self, new: NewRole) -> Result<RoleWithPermissions, StoreError> {
        let mut tx = self.pool.begin().await?;
        ensure_permissions_exist(&mut *tx, &new.permission_ids).await?;

        let role = sqlx::query_as::<_, Role>(
            r#"
            INSERT INTO roles (role_name, role_key, role_description, is_default)
            VALUES ($1, $2, $3, $4)
            RETURNING id, role_name, role_key, role_description, is_default, created_at, updated_at
            "#,
        )
        .bind(&new.role_name)
        .bind(&new.role_key)
        .bind(&new.role_description)
        .bind(new.is_default)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| StoreError::from_sqlx(e, "role key"))?;

        replace_role_permissions(&mut *tx, role.id, &new.permission_ids).await?;
        tx.commit().await?;

        self.role_with_permissions(role.id)
            .await?
            .ok_or_else(|| StoreError::Corrupt(format!("role {} missing after insert", role.id)))
    }

    #[instrument(skip(self, changes))]
    async fn update_role(
        &self,
        id: RoleId,
        changes: RoleChanges,
    ) -> Result<Option<RoleWithPermissions>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_scalar::<_, RoleId>(
            r#"
            UPDATE roles
            SET role_name = COALESCE($2, role_name),
                role_description = COALESCE($3, role_description),
                is_default = COALESCE($4, is_default),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id
            "#,
        )
        .bind(id)
        .bind(&changes.role_name)
        .bind(&changes.role_description)
        .bind(changes.is_default)
        .fetch_optional(&mut *tx)
        .await?;

        if updated.is_none() {
            return Ok(None);
        }

        if let Some(permission_ids) = &changes.permission_ids {
            ensure_permissions_exist(&mut *tx, permission_ids).await?;
            replace_role_permissions(&mut *tx, id, permission_ids).await?;
        }
        tx.commit().await?;

        self.role_with_permissions(id).await
    }

    #[instrument(skip(self, permission_ids), fields(count = permission_ids.len()))]
    async fn sync_role_permissions(
        &self,
        id: RoleId,
        permission_ids: &[PermissionId],
    ) -> Result<Option<RoleWithPermissions>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let touched = sqlx::query("UPDATE roles SET updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if touched == 0 {
            return Ok(None);
        }

        ensure_permissions_exist(&mut *tx, permission_ids).await?;
        replace_role_permissions(&mut *tx, id, permission_ids).await?;
        tx.commit().await?;

        self.role_with_permissions(id).await
    }

    async fn get_role(&self, id: RoleId) -> Result<Option<RoleWithPermissions>, StoreError> {
        self.role_with_permissions(id).await
    }

    async fn list_roles(
        &self,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<RoleWithPermissions>, i64), StoreError> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM roles
            WHERE ($1::text IS NULL OR role_name ILIKE '%' || $1 || '%' OR role_key ILIKE '%' || $1 || '%')
            "#,
        )
        .bind(search)
        .fetch_one(&self.pool)
        .await?;

        let roles = sqlx::query_as::<_, Role>(
            r#"
            SELECT id, role_name, role_key, role_description, is_default, created_at, updated_at
            FROM roles
            WHERE ($1::text IS NULL OR role_name ILIKE '%' || $1 || '%' OR role_key ILIKE '%' || $1 || '%')
            ORDER BY role_name, id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(search)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((self.attach_permissions(roles).await?, total))
    }

    /// Unlinks institutes and faculties first and stamps `role_revoked_at`, so
    /// sessions issued before the deletion stop resolving.
    #[instrument(skip(self))]
    async fn delete_role(&self, id: RoleId) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE institutes
            SET role_id = NULL, role_revoked_at = NOW(), updated_at = NOW()
            WHERE role_id = $1
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE faculties
            SET role_id = NULL, role_revoked_at = NOW(), updated_at = NOW()
            WHERE role_id = $1
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let deleted = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok(deleted > 0)
    }

    async fn list_permissions(&self) -> Result<Vec<Permission>, StoreError> {
        let permissions = sqlx::query_as::<_, Permission>(
            "SELECT id, permission_name, permission_key, created_at FROM permissions ORDER BY permission_key",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(permissions)
    }

    #[instrument(skip(self, entries), fields(count = entries.len()))]
    async fn upsert_permissions(&self, entries: &[NewPermission]) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut affected = 0;

        for entry in entries {
            affected += sqlx::query(
                r#"
                INSERT INTO permissions (permission_key, permission_name)
                VALUES ($1, $2)
                ON CONFLICT (permission_key) DO UPDATE
                SET permission_name = EXCLUDED.permission_name
                "#,
            )
            .bind(&entry.permission_key)
            .bind(&entry.permission_name)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        tx.commit().await?;
        Ok(affected)
    }

    async fn find_role_by_key(&self, role_key: &str) -> Result<Option<Role>, StoreError> {
        let role = sqlx::query_as::<_, Role>(
            r#"
            SELECT id, role_name, role_key, role_description, is_default, created_at, updated_at
            FROM roles WHERE role_key = $1
            "#,
        )
        .bind(role_key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(role)
    }

    #[instrument(skip(self, role_ids), fields(count = role_ids.len()))]
    async fn assign_user_roles(
        &self,
        user_id: UserId,
        role_ids: &[RoleId],
    ) -> Result<Option<Vec<Role>>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)",
        )
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;
        if !exists {
            return Ok(None);
        }

        ensure_roles_exist(&mut *tx, role_ids).await?;

        sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        if !role_ids.is_empty() {
            sqlx::query(
                r#"
                INSERT INTO user_roles (user_id, role_id)
                SELECT $1, UNNEST($2::uuid[])
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(user_id)
            .bind(role_ids.to_vec())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        self.user_roles(user_id).await
    }

    async fn user_roles(&self, user_id: UserId) -> Result<Option<Vec<Role>>, StoreError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        if !exists {
            return Ok(None);
        }

        let roles = sqlx::query_as::<_, Role>(
            r#"
            SELECT r.id, r.role_name, r.role_key, r.role_description, r.is_default,
                   r.created_at, r.updated_at
            FROM user_roles ur
            JOIN roles r ON r.id = ur.role_id
            WHERE ur.user_id = $1
            ORDER BY r.role_name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(roles))
    }
}

#[async_trait]
impl DirectoryStore for PgStore {
    async fn create_department(
        &self,
        institute_id: InstituteId,
        name: &str,
    ) -> Result<DepartmentId, StoreError> {
        sqlx::query_scalar::<_, DepartmentId>(
            "INSERT INTO departments (institute_id, name) VALUES ($1, $2) RETURNING id",
        )
        .bind(institute_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::from_sqlx(e, "department"))
    }

    #[instrument(skip(self, new), fields(email = %new.email))]
    async fn create_institute(&self, new: NewInstitute) -> Result<Institute, StoreError> {
        let mut tx = self.pool.begin().await?;
        if let Some(role_id) = new.role_id {
            ensure_roles_exist(&mut *tx, &[role_id]).await?;
        }

        let institute = sqlx::query_as::<_, Institute>(
            r#"
            INSERT INTO institutes (name, email, mobile, password_hash, role_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, email, mobile, is_active, role_id, created_at, updated_at
            "#,
        )
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.mobile)
        .bind(&new.password_hash)
        .bind(new.role_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| StoreError::from_sqlx(e, "institute email"))?;

        tx.commit().await?;
        Ok(institute)
    }

    async fn list_institutes(
        &self,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Institute>, i64), StoreError> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM institutes
            WHERE ($1::text IS NULL OR name ILIKE '%' || $1 || '%' OR email ILIKE '%' || $1 || '%')
            "#,
        )
        .bind(search)
        .fetch_one(&self.pool)
        .await?;

        let institutes = sqlx::query_as::<_, Institute>(
            r#"
            SELECT id, name, email, mobile, is_active, role_id, created_at, updated_at
            FROM institutes
            WHERE ($1::text IS NULL OR name ILIKE '%' || $1 || '%' OR email ILIKE '%' || $1 || '%')
            ORDER BY name, id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(search)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((institutes, total))
    }

    async fn get_institute(&self, id: InstituteId) -> Result<Option<Institute>, StoreError> {
        let institute = sqlx::query_as::<_, Institute>(
            r#"
            SELECT id, name, email, mobile, is_active, role_id, created_at, updated_at
            FROM institutes WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(institute)
    }

    #[instrument(skip(self))]
    async fn link_institute_role(
        &self,
        id: InstituteId,
        role_id: Option<RoleId>,
    ) -> Result<Option<Institute>, StoreError> {
        let mut tx = self.pool.begin().await?;
        if let Some(role_id) = role_id {
            ensure_roles_exist(&mut *tx, &[role_id]).await?;
        }

        let institute = sqlx::query_as::<_, Institute>(
            r#"
            UPDATE institutes SET role_id = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, email, mobile, is_active, role_id, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(role_id)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(institute)
    }

    #[instrument(skip(self, new), fields(email = %new.email, institute_id = %new.institute_id))]
    async fn create_faculty(&self, new: NewFaculty) -> Result<Faculty, StoreError> {
        let mut tx = self.pool.begin().await?;

        let institute_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM institutes WHERE id = $1)")
                .bind(new.institute_id)
                .fetch_one(&mut *tx)
                .await?;
        if !institute_exists {
            return Err(StoreError::InvalidReference("institute".to_string()));
        }

        if let Some(department_id) = new.department_id {
            let in_institute: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM departments WHERE id = $1 AND institute_id = $2)",
            )
            .bind(department_id)
            .bind(new.institute_id)
            .fetch_one(&mut *tx)
            .await?;
            if !in_institute {
                return Err(StoreError::InvalidReference("department".to_string()));
            }
        }

        if let Some(role_id) = new.role_id {
            ensure_roles_exist(&mut *tx, &[role_id]).await?;
        }

        let faculty = sqlx::query_as::<_, Faculty>(
            r#"
            INSERT INTO faculties (institute_id, department_id, name, email, mobile, password_hash, role_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, institute_id, department_id, name, email, mobile, is_active, role_id,
                      created_at, updated_at
            "#,
        )
        .bind(new.institute_id)
        .bind(new.department_id)
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.mobile)
        .bind(&new.password_hash)
        .bind(new.role_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| StoreError::from_sqlx(e, "faculty email"))?;

        tx.commit().await?;
        Ok(faculty)
    }

    async fn list_faculties(
        &self,
        institute_id: Option<InstituteId>,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Faculty>, i64), StoreError> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM faculties
            WHERE ($1::uuid IS NULL OR institute_id = $1)
              AND ($2::text IS NULL OR name ILIKE '%' || $2 || '%' OR email ILIKE '%' || $2 || '%')
            "#,
        )
        .bind(institute_id)
        .bind(search)
        .fetch_one(&self.pool)
        .await?;

        let faculties = sqlx::query_as::<_, Faculty>(
            r#"
            SELECT id, institute_id, department_id, name, email, mobile, is_active, role_id,
                   created_at, updated_at
            FROM faculties
            WHERE ($1::uuid IS NULL OR institute_id = $1)
              AND ($2::text IS NULL OR name ILIKE '%' || $2 || '%' OR email ILIKE '%' || $2 || '%')
            ORDER BY name, id
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(institute_id)
        .bind(search)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((faculties, total))
    }

    async fn get_faculty(&self, id: FacultyId) -> Result<Option<Faculty>, StoreError> {
        let faculty = sqlx::query_as::<_, Faculty>(
            r#"
            SELECT id, institute_id, department_id, name, email, mobile, is_active, role_id,
                   created_at, updated_at
            FROM faculties WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(faculty)
    }

    #[instrument(skip(self))]
    async fn link_faculty_role(
        &self,
        id: FacultyId,
        role_id: Option<RoleId>,
    ) -> Result<Option<Faculty>, StoreError> {
        let mut tx = self.pool.begin().await?;
        if let Some(role_id) = role_id {
            ensure_roles_exist(&mut *tx, &[role_id]).await?;
        }

        let faculty = sqlx::query_as::<_, Faculty>(
            r#"
            UPDATE faculties SET role_id = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, institute_id, department_id, name, email, mobile, is_active, role_id,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(role_id)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(faculty)
    }
}
