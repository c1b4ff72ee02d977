use anyhow::anyhow;
use tracing::{info, instrument};

use lectern_core::{AppError, PaginationMeta, PermissionCatalog};
use lectern_db::{NewRole, RoleChanges, RoleStore, StoreError};
use lectern_models::{
    AssignUserRolesDto, CatalogEntry, CatalogModule, CreateRoleDto, PaginatedRolesResponse,
    Permission, PermissionCatalogResponse, RoleFilterParams, RoleId, RoleWithPermissions,
    SyncPermissionsDto, UpdateRoleDto, UserId, UserRolesResponse, role_key_from_name,
};

fn role_not_found() -> AppError {
    AppError::not_found(anyhow!("Role not found"))
}

// ============ Role Services ============

#[instrument(skip(store, dto), fields(role_name = %dto.role_name))]
pub async fn create_role(
    store: &dyn RoleStore,
    dto: CreateRoleDto,
) -> Result<RoleWithPermissions, AppError> {
    let role_key = match dto.role_key {
        Some(key) => key.trim().to_string(),
        None => role_key_from_name(&dto.role_name),
    };
    if role_key.is_empty() {
        return Err(AppError::bad_request(anyhow!(
            "Role key could not be derived from the role name"
        )));
    }

    let role = store
        .create_role(NewRole {
            role_name: dto.role_name.trim().to_string(),
            role_key,
            role_description: dto.role_description,
            is_default: dto.is_default,
            permission_ids: dto.permission_ids,
        })
        .await
        .map_err(StoreError::into_app_error)?;

    info!(role_id = %role.role.id, role_key = %role.role.role_key, "Role created");
    Ok(role)
}

#[instrument(skip(store))]
pub async fn list_roles(
    store: &dyn RoleStore,
    params: RoleFilterParams,
) -> Result<PaginatedRolesResponse, AppError> {
    let search = params.search.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let (roles, total) = store
        .list_roles(
            search,
            params.pagination.limit(),
            params.pagination.offset(),
        )
        .await
        .map_err(StoreError::into_app_error)?;

    let meta = PaginationMeta::for_page(&params.pagination, total, roles.len());
    Ok(PaginatedRolesResponse { data: roles, meta })
}

#[instrument(skip(store))]
pub async fn get_role(store: &dyn RoleStore, id: RoleId) -> Result<RoleWithPermissions, AppError> {
    store
        .get_role(id)
        .await
        .map_err(StoreError::into_app_error)?
        .ok_or_else(role_not_found)
}

#[instrument(skip(store, dto))]
pub async fn update_role(
    store: &dyn RoleStore,
    id: RoleId,
    dto: UpdateRoleDto,
) -> Result<RoleWithPermissions, AppError> {
    let changes = RoleChanges {
        role_name: dto.role_name.map(|name| name.trim().to_string()),
        role_description: dto.role_description,
        is_default: dto.is_default,
        permission_ids: dto.permission_ids,
    };

    let role = store
        .update_role(id, changes)
        .await
        .map_err(StoreError::into_app_error)?
        .ok_or_else(role_not_found)?;

    info!(role_id = %id, "Role updated");
    Ok(role)
}

/// Replaces the role's permission set with exactly `dto.permission_ids`.
#[instrument(skip(store, dto), fields(count = dto.permission_ids.len()))]
pub async fn sync_role_permissions(
    store: &dyn RoleStore,
    id: RoleId,
    dto: SyncPermissionsDto,
) -> Result<RoleWithPermissions, AppError> {
    let role = store
        .sync_role_permissions(id, &dto.permission_ids)
        .await
        .map_err(StoreError::into_app_error)?
        .ok_or_else(role_not_found)?;

    info!(role_id = %id, permissions = role.permissions.len(), "Role permissions synced");
    Ok(role)
}

/// Institutes and faculties linked to the role are left without one.
#[instrument(skip(store))]
pub async fn delete_role(store: &dyn RoleStore, id: RoleId) -> Result<(), AppError> {
    let deleted = store
        .delete_role(id)
        .await
        .map_err(StoreError::into_app_error)?;
    if !deleted {
        return Err(role_not_found());
    }

    info!(role_id = %id, "Role deleted");
    Ok(())
}

// ============ Permission Services ============

#[instrument(skip(store))]
pub async fn list_permissions(store: &dyn RoleStore) -> Result<Vec<Permission>, AppError> {
    store
        .list_permissions()
        .await
        .map_err(StoreError::into_app_error)
}

/// The compiled catalog grouped by module. Never touches the store.
pub fn catalog(catalog: &PermissionCatalog) -> PermissionCatalogResponse {
    let modules = catalog
        .modules()
        .iter()
        .map(|(module, keys)| CatalogModule {
            module: *module,
            permissions: keys
                .iter()
                .map(|key| CatalogEntry {
                    key: *key,
                    name: key.display_name().to_string(),
                    action: key.action(),
                })
                .collect(),
        })
        .collect();

    PermissionCatalogResponse { modules }
}

// ============ User Role Services ============

#[instrument(skip(store))]
pub async fn get_user_roles(
    store: &dyn RoleStore,
    user_id: UserId,
) -> Result<UserRolesResponse, AppError> {
    let roles = store
        .user_roles(user_id)
        .await
        .map_err(StoreError::into_app_error)?
        .ok_or_else(|| AppError::not_found(anyhow!("User not found")))?;

    Ok(UserRolesResponse { user_id, roles })
}

/// Replaces the user's roles with exactly `dto.role_ids`.
#[instrument(skip(store, dto), fields(count = dto.role_ids.len()))]
pub async fn assign_user_roles(
    store: &dyn RoleStore,
    user_id: UserId,
    dto: AssignUserRolesDto,
) -> Result<UserRolesResponse, AppError> {
    let roles = store
        .assign_user_roles(user_id, &dto.role_ids)
        .await
        .map_err(StoreError::into_app_error)?
        .ok_or_else(|| AppError::not_found(anyhow!("User not found")))?;

    info!(%user_id, roles = roles.len(), "User roles assigned");
    Ok(UserRolesResponse { user_id, roles })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_core::{PaginationParams, PermissionKey};
    use lectern_db::MemoryStore;

    fn create_dto(name: &str, permission_ids: Vec<lectern_models::PermissionId>) -> CreateRoleDto {
        CreateRoleDto {
            role_name: name.to_string(),
            role_key: None,
            role_description: None,
            is_default: false,
            permission_ids,
        }
    }

    #[tokio::test]
    async fn test_create_role_derives_key() {
        let store = MemoryStore::with_catalog().await;
        let role = create_role(&store, create_dto("Department Head", vec![]))
            .await
            .unwrap();
        assert_eq!(role.role.role_key, "department_head");
    }

    #[tokio::test]
    async fn test_create_role_rejects_underivable_key() {
        let store = MemoryStore::with_catalog().await;
        let err = create_role(&store, create_dto("!!!", vec![])).await.unwrap_err();
        assert_eq!(err.status.as_u16(), 400);
    }

    #[tokio::test]
    async fn test_duplicate_role_key_conflicts() {
        let store = MemoryStore::with_catalog().await;
        create_role(&store, create_dto("Tutor", vec![])).await.unwrap();
        let err = create_role(&store, create_dto("Tutor", vec![]))
            .await
            .unwrap_err();
        assert_eq!(err.status.as_u16(), 409);
    }

    #[tokio::test]
    async fn test_sync_replaces_permission_set() {
        let store = MemoryStore::with_catalog().await;
        let view = store.permission_id("lecture_view").await.unwrap();
        let list = store.permission_id("lecture_list").await.unwrap();
        let role = create_role(&store, create_dto("Reader", vec![view]))
            .await
            .unwrap();

        let synced = sync_role_permissions(
            &store,
            role.role.id,
            SyncPermissionsDto {
                permission_ids: vec![list],
            },
        )
        .await
        .unwrap();

        let keys: Vec<_> = synced
            .permissions
            .iter()
            .map(|p| p.permission_key.as_str())
            .collect();
        assert_eq!(keys, vec!["lecture_list"]);
    }

    #[tokio::test]
    async fn test_missing_role_is_not_found() {
        let store = MemoryStore::with_catalog().await;
        let id = RoleId::new();
        assert_eq!(get_role(&store, id).await.unwrap_err().status.as_u16(), 404);
        assert_eq!(delete_role(&store, id).await.unwrap_err().status.as_u16(), 404);
    }

    #[tokio::test]
    async fn test_list_roles_reports_meta() {
        let store = MemoryStore::with_catalog().await;
        for name in ["Alpha", "Beta", "Gamma"] {
            create_role(&store, create_dto(name, vec![])).await.unwrap();
        }

        let page = list_roles(
            &store,
            RoleFilterParams {
                search: None,
                pagination: PaginationParams {
                    limit: Some(2),
                    offset: Some(0),
                    page: None,
                },
            },
        )
        .await
        .unwrap();

        assert_eq!(page.data.len(), 2);
        assert_eq!(page.meta.total, 3);
        assert!(page.meta.has_more);
    }

    #[test]
    fn test_catalog_groups_every_key() {
        let response = catalog(&PermissionCatalog::standard().unwrap());
        let total: usize = response.modules.iter().map(|m| m.permissions.len()).sum();
        assert_eq!(total, PermissionKey::ALL.len());
        assert!(
            response
                .modules
                .iter()
                .all(|m| m.permissions.iter().all(|p| p.key.module() == m.module))
        );
    }
}
