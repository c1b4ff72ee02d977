//! Keeps the `permissions` table in step with the compiled catalog and seeds
//! the default institute and faculty roles.

use std::collections::HashMap;

use lectern_core::{PermissionAction, PermissionKey, PermissionModule};
use lectern_db::{NewPermission, NewRole, RoleStore};
use lectern_models::{PermissionId, Role};

/// Catalog rows as they are stored.
pub fn catalog_entries() -> Vec<NewPermission> {
    PermissionKey::ALL
        .iter()
        .map(|key| NewPermission {
            permission_key: key.as_str().to_string(),
            permission_name: key.display_name().to_string(),
        })
        .collect()
}

/// Upserts every catalog key. Safe to run on every deploy.
pub async fn sync_permissions(store: &dyn RoleStore) -> Result<u64, Box<dyn std::error::Error>> {
    let entries = catalog_entries();
    let synced = store.upsert_permissions(&entries).await?;
    Ok(synced)
}

/// A role created by `seed-roles` when missing.
#[derive(Debug, Clone)]
pub struct DefaultRole {
    pub role_key: &'static str,
    pub role_name: &'static str,
    pub description: &'static str,
    pub permissions: Vec<PermissionKey>,
}

fn keys_where(filter: impl Fn(PermissionKey) -> bool) -> Vec<PermissionKey> {
    PermissionKey::ALL.iter().copied().filter(|k| filter(*k)).collect()
}

pub fn default_roles() -> Vec<DefaultRole> {
    vec![
        DefaultRole {
            role_key: "institute",
            role_name: "Institute",
            description: "Manages faculties, departments, students, events and lectures of one institute",
            permissions: keys_where(|k| {
                matches!(
                    k.module(),
                    PermissionModule::Faculty
                        | PermissionModule::Department
                        | PermissionModule::Student
                        | PermissionModule::Event
                        | PermissionModule::Lecture
                )
            }),
        },
        DefaultRole {
            role_key: "faculty",
            role_name: "Faculty",
            description: "Teaches lectures and follows events and students",
            permissions: keys_where(|k| match k.module() {
                PermissionModule::Lecture => k.action() != PermissionAction::Delete,
                PermissionModule::Event | PermissionModule::Student => {
                    matches!(k.action(), PermissionAction::List | PermissionAction::View)
                }
                PermissionModule::Department => k.action() == PermissionAction::View,
                _ => false,
            }),
        },
    ]
}

/// What `seed-roles` did for one default role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedOutcome {
    Created(Role),
    AlreadyPresent(Role),
}

/// Creates each default role that does not exist yet.
///
/// Existing roles keep whatever permissions an admin has given them.
pub async fn seed_default_roles(
    store: &dyn RoleStore,
) -> Result<Vec<SeedOutcome>, Box<dyn std::error::Error>> {
    let ids: HashMap<String, PermissionId> = store
        .list_permissions()
        .await?
        .into_iter()
        .map(|p| (p.permission_key, p.id))
        .collect();

    let mut outcomes = Vec::new();
    for default in default_roles() {
        if let Some(existing) = store.find_role_by_key(default.role_key).await? {
            outcomes.push(SeedOutcome::AlreadyPresent(existing));
            continue;
        }

        let permission_ids = default
            .permissions
            .iter()
            .map(|key| {
                ids.get(key.as_str()).copied().ok_or_else(|| {
                    format!(
                        "Permission {} is not in the database, run sync-permissions first",
                        key
                    )
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let created = store
            .create_role(NewRole {
                role_name: default.role_name.to_string(),
                role_key: default.role_key.to_string(),
                role_description: Some(default.description.to_string()),
                is_default: true,
                permission_ids,
            })
            .await?;
        outcomes.push(SeedOutcome::Created(created.role));
    }

    Ok(outcomes)
}
